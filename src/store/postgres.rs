use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use std::time::Duration;

use super::{CatalogStore, OrderStore, StoreError};
use crate::domain::order::{
    CatalogPrice, MenuItemDetails, MenuItemId, Money, NewOrder, Order, OrderId, OrderLineItem, OrderListFilter,
    OrderStatus, OrderSummary, OrderWithItems, StatusTransition, UserId,
};

// ============================================================================
// Postgres Store
// ============================================================================
//
// Amounts in `orders` / `order_items` are BIGINT minor units. The catalog's
// `menu_items.price` is NUMERIC(10,2) and is converted to minor units in SQL.
//
// ============================================================================

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.status, o.delivery_address, o.delivery_phone, \
     o.payment_method, o.special_instructions, o.scheduled_delivery, o.subtotal_minor, \
     o.delivery_fee_minor, o.tax_amount_minor, o.total_amount_minor, o.created_at";

// Catalog details are LEFT JOINed so a removed menu item never hides a line
const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.menu_item_id, oi.quantity, \
     oi.unit_price_minor, oi.line_total_minor, mi.name, mi.image_url, k.name AS kitchen_name \
     FROM order_items oi \
     LEFT JOIN menu_items mi ON mi.id = oi.menu_item_id \
     LEFT JOIN kitchens k ON k.id = mi.kitchen_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn items_by_order(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLineItem>>, StoreError> {
        let mut grouped: HashMap<OrderId, Vec<OrderLineItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = sqlx::query(&format!(
            "{ITEM_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.id ASC"
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let item = line_item_from_row(&row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }

        Ok(grouped)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn menu_item_prices(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogPrice>, StoreError> {
        // One statement, one snapshot for the whole cart
        let rows = sqlx::query(
            "SELECT id, (ROUND(price * 100))::BIGINT AS price_minor, is_available
             FROM menu_items
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let entry = CatalogPrice {
                    menu_item_id: row.try_get("id")?,
                    price: Money::from_minor(row.try_get("price_minor")?),
                    available: row.try_get("is_available")?,
                };
                Ok((entry.menu_item_id, entry))
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let header = sqlx::query(
            "INSERT INTO orders (
                user_id, status, delivery_address, delivery_phone, payment_method,
                special_instructions, scheduled_delivery, subtotal_minor,
                delivery_fee_minor, tax_amount_minor, total_amount_minor
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, created_at",
        )
        .bind(order.user_id)
        .bind(order.status().as_str())
        .bind(&order.delivery.address)
        .bind(&order.delivery.phone)
        .bind(order.delivery.payment_method.as_str())
        .bind(&order.delivery.special_instructions)
        .bind(order.delivery.scheduled_delivery)
        .bind(order.subtotal.minor_units())
        .bind(order.delivery_fee.minor_units())
        .bind(order.tax_amount.minor_units())
        .bind(order.total_amount.minor_units())
        .fetch_one(&mut *tx)
        .await?;

        let order_id: OrderId = header.try_get("id")?;
        let created_at: DateTime<Utc> = header.try_get("created_at")?;

        let menu_item_ids: Vec<i64> = order.lines.iter().map(|l| l.menu_item_id).collect();
        let quantities: Vec<i32> = order.lines.iter().map(|l| l.quantity).collect();
        let unit_prices: Vec<i64> = order.lines.iter().map(|l| l.unit_price.minor_units()).collect();
        let line_totals: Vec<i64> = order.lines.iter().map(|l| l.line_total.minor_units()).collect();

        let inserted = sqlx::query(
            "INSERT INTO order_items (
                order_id, menu_item_id, quantity, unit_price_minor, line_total_minor
            )
            SELECT $1, item.menu_item_id, item.quantity, item.unit_price, item.line_total
            FROM UNNEST($2::BIGINT[], $3::INTEGER[], $4::BIGINT[], $5::BIGINT[])
                WITH ORDINALITY AS item(menu_item_id, quantity, unit_price, line_total, position)
            ORDER BY item.position",
        )
        .bind(order_id)
        .bind(&menu_item_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .bind(&line_totals)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted != order.lines.len() as u64 {
            // Dropping `tx` rolls back the header as well
            return Err(StoreError::Corrupt(format!(
                "expected {} line items, inserted {}",
                order.lines.len(),
                inserted
            )));
        }

        tx.commit().await?;

        tracing::debug!(
            order_id = order_id,
            item_count = inserted,
            "Committed order header and line items"
        );

        Ok(order.into_order(order_id, created_at))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "{ITEM_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(line_item_from_row).collect()
    }

    async fn transition_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        allowed: fn(OrderStatus, OrderStatus) -> bool,
    ) -> Result<StatusTransition, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = match current {
            Some(row) => parse_status(row.try_get("status")?)?,
            None => return Ok(StatusTransition::Missing),
        };

        if !allowed(current, next) {
            return Ok(StatusTransition::Rejected { current });
        }

        sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(next.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(StatusTransition::Applied { previous: current })
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             WHERE o.user_id = $1 AND ($2::TEXT IS NULL OR o.status = $2)
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut items = self.items_by_order(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    async fn order_summaries(
        &self,
        filter: OrderListFilter,
    ) -> Result<Vec<OrderSummary>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS}, COUNT(oi.id) AS item_count
             FROM orders o
             LEFT JOIN order_items oi ON oi.order_id = o.id
             WHERE ($1::TEXT IS NULL OR o.status = $1)
             GROUP BY o.id
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderSummary {
                    order: order_from_row(row)?,
                    item_count: row.try_get("item_count")?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_status(raw: String) -> Result<OrderStatus, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown order status {raw:?}")))
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let payment_method: String = row.try_get("payment_method")?;

    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        status: parse_status(row.try_get("status")?)?,
        delivery_address: row.try_get("delivery_address")?,
        delivery_phone: row.try_get("delivery_phone")?,
        payment_method: payment_method
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown payment method {payment_method:?}")))?,
        special_instructions: row.try_get("special_instructions")?,
        scheduled_delivery: row.try_get("scheduled_delivery")?,
        subtotal: Money::from_minor(row.try_get("subtotal_minor")?),
        delivery_fee: Money::from_minor(row.try_get("delivery_fee_minor")?),
        tax_amount: Money::from_minor(row.try_get("tax_amount_minor")?),
        total_amount: Money::from_minor(row.try_get("total_amount_minor")?),
        created_at: row.try_get("created_at")?,
    })
}

fn line_item_from_row(row: &PgRow) -> Result<OrderLineItem, StoreError> {
    Ok(OrderLineItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        menu_item_id: row.try_get("menu_item_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: Money::from_minor(row.try_get("unit_price_minor")?),
        line_total: Money::from_minor(row.try_get("line_total_minor")?),
        details: MenuItemDetails {
            name: row.try_get("name")?,
            image_url: row.try_get("image_url")?,
            kitchen_name: row.try_get("kitchen_name")?,
        },
    })
}

// ============================================================================
// Integration Tests
// ============================================================================
//
// Each test gets a fresh database with migrations applied. They need a
// Postgres reachable through DATABASE_URL:
//   DATABASE_URL=postgres://... cargo test -- --ignored
//
// ============================================================================
