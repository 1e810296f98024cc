use std::sync::Arc;
use std::time::Instant;

use crate::domain::identity::Caller;
use crate::metrics::Metrics;
use crate::store::{CatalogStore, OrderStore, StoreError};

use super::aggregate::{NewOrder, Order, OrderListFilter, OrderSummary, OrderWithItems, StatusTransition};
use super::commands::PlaceOrder;
use super::errors::OrderError;
use super::pricing::PricingPolicy;
use super::value_objects::{MenuItemId, OrderId, OrderStatus, UserId};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Validation → Catalog snapshot → Pricing → Store
//
// Validation runs before any store access; the catalog is read once per
// cart; header and line items are written in one atomic store call.
//
// ============================================================================

pub struct OrderCommandHandler {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    pricing: PricingPolicy,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        pricing: PricingPolicy,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            orders,
            pricing,
            metrics,
        }
    }

    /// Validate, price and persist a new order for `caller_id`
    pub async fn create_order(
        &self,
        caller_id: Option<UserId>,
        command: PlaceOrder,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_create_order(caller_id, command).await;

        match &result {
            Ok(order) => {
                self.metrics.record_order_created(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = order.id,
                    user_id = order.user_id,
                    subtotal = %order.subtotal,
                    total_amount = %order.total_amount,
                    "✅ Order created"
                );
            }
            Err(e) => self.record_failure("create_order", e),
        }

        result
    }

    async fn try_create_order(
        &self,
        caller_id: Option<UserId>,
        command: PlaceOrder,
    ) -> Result<Order, OrderError> {
        let user_id = caller_id.ok_or(OrderError::Unauthorized)?;
        let validated = command.validate()?;

        let mut ids: Vec<MenuItemId> = validated.lines.iter().map(|l| l.menu_item_id).collect();
        ids.sort_unstable();
        ids.dedup();

        tracing::debug!(
            user_id = user_id,
            line_count = validated.lines.len(),
            distinct_items = ids.len(),
            "Reading catalog snapshot for cart"
        );

        let catalog = self.catalog.menu_item_prices(&ids).await?;
        let priced = self.pricing.price(&validated.lines, &catalog)?;

        let new_order = NewOrder::new(user_id, validated.delivery, priced);
        debug_assert_eq!(
            new_order.total_amount,
            new_order.subtotal + new_order.delivery_fee + new_order.tax_amount
        );

        Ok(self.orders.insert_order(new_order).await?)
    }

    /// Change an order's status; administrative callers only
    pub async fn update_order_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        new_status: &str,
    ) -> Result<(), OrderError> {
        let result = self.try_update_order_status(caller, order_id, new_status).await;

        match &result {
            Ok(status) => {
                self.metrics.record_status_update(status.as_str());
                tracing::info!(
                    order_id = order_id,
                    status = %status,
                    updated_by = caller.id,
                    "Order status updated"
                );
            }
            Err(e) => self.record_failure("update_order_status", e),
        }

        result.map(|_| ())
    }

    async fn try_update_order_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        new_status: &str,
    ) -> Result<OrderStatus, OrderError> {
        if !caller.is_administrative() {
            return Err(OrderError::Forbidden);
        }

        let next: OrderStatus = new_status.parse()?;

        match self
            .orders
            .transition_status(order_id, next, OrderStatus::can_transition_to)
            .await?
        {
            StatusTransition::Applied { previous } => {
                tracing::debug!(order_id = order_id, from = %previous, to = %next, "Status transition applied");
                Ok(next)
            }
            StatusTransition::Rejected { current } => {
                Err(OrderError::InvalidStatusTransition(current))
            }
            StatusTransition::Missing => Err(OrderError::NotFound),
        }
    }

    /// Order header plus items, visible to its owner and to administrators
    pub async fn get_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderWithItems, OrderError> {
        let order = self
            .orders
            .find_order(order_id)
            .await?
            // Non-owners get the same answer as for a missing order
            .filter(|order| caller.is_administrative() || order.user_id == caller.id)
            .ok_or(OrderError::NotFound)?;

        let items = self.orders.order_items(order_id).await?;

        Ok(OrderWithItems { order, items })
    }

    /// The caller's own orders, newest first
    pub async fn list_user_orders(
        &self,
        caller: &Caller,
        status: Option<&str>,
    ) -> Result<Vec<OrderWithItems>, OrderError> {
        let status = OrderStatus::parse_filter(status)?;
        Ok(self.orders.orders_for_user(caller.id, status).await?)
    }

    /// Every order with its line count; administrative callers only
    pub async fn list_all_orders(
        &self,
        caller: &Caller,
        status: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<OrderSummary>, OrderError> {
        if !caller.is_administrative() {
            return Err(OrderError::Forbidden);
        }

        let filter = OrderListFilter::new(OrderStatus::parse_filter(status)?, limit, offset);
        Ok(self.orders.order_summaries(filter).await?)
    }

    /// Round-trip to the order store
    pub async fn ping_store(&self) -> Result<(), StoreError> {
        self.orders.ping().await
    }

    fn record_failure(&self, operation: &str, error: &OrderError) {
        self.metrics.record_failure(operation, error.kind());

        match error {
            OrderError::Persistence(e) => {
                tracing::error!(operation = operation, error = %e, "Order store failure");
            }
            other => {
                tracing::warn!(operation = operation, kind = other.kind(), error = %other, "Order request rejected");
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::Role;
    use crate::domain::order::{CartLine, DeliveryInfo, Money};
    use crate::store::InMemoryStore;

    async fn setup() -> (Arc<InMemoryStore>, OrderCommandHandler) {
        let store = Arc::new(InMemoryStore::new());
        store.put_menu_item(7, Money::from_major(150), true).await;
        store.put_menu_item(8, Money::from_minor(9_950), true).await;
        store.put_menu_item(9, Money::from_major(80), false).await;

        let handler = OrderCommandHandler::new(
            store.clone(),
            store.clone(),
            PricingPolicy::default(),
            Arc::new(Metrics::new().unwrap()),
        );
        (store, handler)
    }

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            address: Some("221B Baker Street".to_string()),
            phone: Some("9876543210".to_string()),
            payment_method: Some("cod".to_string()),
            special_instructions: Some("Ring twice".to_string()),
            scheduled_delivery: None,
        }
    }

    fn cart(lines: &[(MenuItemId, i32)]) -> PlaceOrder {
        PlaceOrder::new(
            lines.iter().map(|&(id, qty)| CartLine::new(id, qty)).collect(),
            delivery(),
        )
    }

    #[tokio::test]
    async fn test_create_order_scenario() {
        let (_, handler) = setup().await;

        let order = handler.create_order(Some(1), cart(&[(7, 2)])).await.unwrap();

        assert_eq!(order.user_id, 1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, Money::from_major(300));
        assert_eq!(order.delivery_fee, Money::from_major(40));
        assert_eq!(order.tax_amount, Money::from_major(15));
        assert_eq!(order.total_amount, Money::from_major(355));
        assert_eq!(order.special_instructions.as_deref(), Some("Ring twice"));
    }

    #[tokio::test]
    async fn test_create_order_persists_line_items() {
        let (_, handler) = setup().await;
        let caller = Caller::customer(1);

        let order = handler
            .create_order(Some(caller.id), cart(&[(7, 1), (8, 3)]))
            .await
            .unwrap();
        let fetched = handler.get_order(&caller, order.id).await.unwrap();

        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.items[1].unit_price, Money::from_minor(9_950));
        assert_eq!(fetched.items[1].line_total, Money::from_minor(29_850));
        assert_eq!(
            fetched.order.subtotal,
            fetched.items.iter().map(|i| i.line_total).sum::<Money>()
        );
        assert!(fetched.order.totals_balance());
    }

    #[tokio::test]
    async fn test_create_order_without_caller_is_unauthorized() {
        let (store, handler) = setup().await;

        let err = handler.create_order(None, cart(&[(7, 1)])).await.unwrap_err();

        assert!(matches!(err, OrderError::Unauthorized));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_cart_writes_nothing() {
        let (store, handler) = setup().await;

        let err = handler.create_order(Some(1), cart(&[])).await.unwrap_err();

        assert!(matches!(err, OrderError::InvalidRequest(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_item_writes_nothing() {
        let (store, handler) = setup().await;

        let err = handler
            .create_order(Some(1), cart(&[(7, 1), (999, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ItemUnavailable(999)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.line_item_count().await, 0);
        let listed = handler
            .list_user_orders(&Caller::customer(1), None)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_item_writes_nothing() {
        let (store, handler) = setup().await;

        let err = handler.create_order(Some(1), cart(&[(9, 1)])).await.unwrap_err();

        assert!(matches!(err, OrderError::ItemUnavailable(9)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_no_rows() {
        let (store, handler) = setup().await;
        store.set_fail_writes(true);

        let err = handler.create_order(Some(1), cart(&[(7, 2)])).await.unwrap_err();

        assert!(matches!(err, OrderError::Persistence(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.line_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_price_is_read_at_creation_time() {
        let (store, handler) = setup().await;
        let caller = Caller::customer(1);

        let first = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();
        store.put_menu_item(7, Money::from_major(200), true).await;
        let second = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        assert_eq!(first.subtotal, Money::from_major(150));
        assert_eq!(second.subtotal, Money::from_major(200));

        // Stored values are not re-derived from the new catalog price
        let refetched = handler.get_order(&caller, first.id).await.unwrap();
        assert_eq!(refetched.order.subtotal, Money::from_major(150));
        assert_eq!(refetched.items[0].unit_price, Money::from_major(150));
    }

    #[tokio::test]
    async fn test_get_order_is_idempotent() {
        let (_, handler) = setup().await;
        let caller = Caller::customer(1);
        let order = handler.create_order(Some(1), cart(&[(8, 2)])).await.unwrap();

        let a = handler.get_order(&caller, order.id).await.unwrap();
        let b = handler.get_order(&caller, order.id).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.order.total_amount, order.total_amount);
    }

    #[tokio::test]
    async fn test_non_owner_gets_not_found() {
        let (_, handler) = setup().await;
        let order = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        let stranger = Caller::new(2, Role::KitchenOwner);
        let err = handler.get_order(&stranger, order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound));

        let admin = Caller::admin(99);
        assert!(handler.get_order(&admin, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let (_, handler) = setup().await;
        let err = handler.get_order(&Caller::admin(1), 42).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_update_status() {
        let (_, handler) = setup().await;
        let owner = Caller::customer(1);
        let order = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        let err = handler
            .update_order_status(&owner, order.id, "delivered")
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Forbidden));
        let fetched = handler.get_order(&owner, order.id).await.unwrap();
        assert_eq!(fetched.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_admin_updates_status_in_any_order() {
        let (_, handler) = setup().await;
        let admin = Caller::admin(99);
        let order = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        handler.update_order_status(&admin, order.id, "ready").await.unwrap();
        handler.update_order_status(&admin, order.id, "confirmed").await.unwrap();
        handler.update_order_status(&admin, order.id, "delivered").await.unwrap();

        let fetched = handler.get_order(&admin, order.id).await.unwrap();
        assert_eq!(fetched.order.status, OrderStatus::Delivered);
        assert_eq!(fetched.order.total_amount, order.total_amount);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let (_, handler) = setup().await;
        let admin = Caller::admin(99);
        let order = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        handler.update_order_status(&admin, order.id, "cancelled").await.unwrap();
        let err = handler
            .update_order_status(&admin, order.id, "pending")
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidStatusTransition(OrderStatus::Cancelled)));
    }

    #[tokio::test]
    async fn test_invalid_and_missing_status_targets() {
        let (_, handler) = setup().await;
        let admin = Caller::admin(99);
        let order = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();

        let err = handler
            .update_order_status(&admin, order.id, "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatus(_)));

        let err = handler
            .update_order_status(&admin, 4040, "ready")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    #[tokio::test]
    async fn test_user_listing_filters_by_owner_and_status() {
        let (_, handler) = setup().await;
        let admin = Caller::admin(99);
        let first = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap();
        let second = handler.create_order(Some(1), cart(&[(8, 1)])).await.unwrap();
        handler.create_order(Some(2), cart(&[(7, 1)])).await.unwrap();
        handler.update_order_status(&admin, first.id, "ready").await.unwrap();

        let mine = handler
            .list_user_orders(&Caller::customer(1), Some("all"))
            .await
            .unwrap();
        let ids: Vec<OrderId> = mine.iter().map(|o| o.order.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let ready = handler
            .list_user_orders(&Caller::customer(1), Some("ready"))
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].order.id, first.id);
        assert_eq!(ready[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_listing_requires_admin() {
        let (_, handler) = setup().await;
        handler.create_order(Some(1), cart(&[(7, 1), (8, 1)])).await.unwrap();

        let err = handler
            .list_all_orders(&Caller::customer(1), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden));

        let all = handler
            .list_all_orders(&Caller::admin(99), Some("pending"), Some(10), Some(0))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].item_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_terminal_updates_serialize() {
        let (_, handler) = setup().await;
        let handler = Arc::new(handler);
        let admin = Caller::admin(100);
        let order_id = handler.create_order(Some(1), cart(&[(7, 1)])).await.unwrap().id;

        let deliver = {
            let handler = handler.clone();
            tokio::spawn(async move {
                handler.update_order_status(&admin, order_id, "delivered").await
            })
        };
        let cancel = {
            let handler = handler.clone();
            tokio::spawn(async move {
                handler.update_order_status(&admin, order_id, "cancelled").await
            })
        };
        let (delivered, cancelled) = tokio::join!(deliver, cancel);
        let (delivered, cancelled) = (delivered.unwrap(), cancelled.unwrap());

        // Exactly one wins; the loser sees the winner's terminal status
        assert!(delivered.is_ok() != cancelled.is_ok());
        let final_status = handler.get_order(&admin, order_id).await.unwrap().order.status;
        let loser = if delivered.is_ok() { cancelled } else { delivered };
        assert!(matches!(
            loser,
            Err(OrderError::InvalidStatusTransition(current)) if current == final_status
        ));
    }
}
