use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{CatalogStore, OrderStore, StoreError};
use crate::domain::order::{
    CatalogPrice, MenuItemDetails, MenuItemId, Money, NewOrder, Order, OrderId, OrderLineItem, OrderListFilter,
    OrderStatus, OrderSummary, OrderWithItems, StatusTransition, UserId,
};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// All state sits behind one RwLock, so each write is atomic with respect to
// every reader. A failing write returns before anything is committed.
//
// ============================================================================

#[derive(Default)]
struct State {
    menu_items: HashMap<MenuItemId, CatalogPrice>,
    menu_details: HashMap<MenuItemId, MenuItemDetails>,
    orders: BTreeMap<OrderId, Order>,
    items: Vec<OrderLineItem>,
    next_order_id: OrderId,
    next_item_id: i64,
}

impl State {
    /// Line items of one order with the current catalog details joined in
    fn items_for(&self, order_id: OrderId) -> Vec<OrderLineItem> {
        self.items
            .iter()
            .filter(|item| item.order_id == order_id)
            .map(|item| OrderLineItem {
                details: self
                    .menu_details
                    .get(&item.menu_item_id)
                    .cloned()
                    .unwrap_or_default(),
                ..item.clone()
            })
            .collect()
    }

    /// Orders matching `keep`, newest first
    fn newest_first(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().filter(|o| keep(*o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog entry
    pub async fn put_menu_item(&self, id: MenuItemId, price: Money, available: bool) {
        self.state.write().await.menu_items.insert(
            id,
            CatalogPrice {
                menu_item_id: id,
                price,
                available,
            },
        );
    }

    /// Attach display details to a catalog entry
    pub async fn describe_menu_item(
        &self,
        id: MenuItemId,
        name: &str,
        image_url: Option<&str>,
        kitchen_name: &str,
    ) {
        self.state.write().await.menu_details.insert(
            id,
            MenuItemDetails {
                name: Some(name.to_string()),
                image_url: image_url.map(str::to_string),
                kitchen_name: Some(kitchen_name.to_string()),
            },
        );
    }

    /// Make every subsequent write fail until switched back off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    pub async fn line_item_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn menu_item_prices(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogPrice>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.menu_items.get(id).map(|entry| (*id, *entry)))
            .collect())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut state = self.state.write().await;

        let order_id = state.next_order_id + 1;
        let mut next_item_id = state.next_item_id;
        let items: Vec<OrderLineItem> = order
            .lines
            .iter()
            .map(|line| {
                next_item_id += 1;
                OrderLineItem {
                    id: next_item_id,
                    order_id,
                    menu_item_id: line.menu_item_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.line_total,
                    details: MenuItemDetails::default(),
                }
            })
            .collect();
        let header = order.into_order(order_id, Utc::now());

        // Everything above is staged; nothing is visible until here
        self.check_writable()?;

        state.next_order_id = order_id;
        state.next_item_id = next_item_id;
        state.orders.insert(order_id, header.clone());
        state.items.extend(items);

        Ok(header)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>, StoreError> {
        Ok(self.state.read().await.items_for(id))
    }

    async fn transition_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        allowed: fn(OrderStatus, OrderStatus) -> bool,
    ) -> Result<StatusTransition, StoreError> {
        let mut state = self.state.write().await;

        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(StatusTransition::Missing);
        };

        let current = order.status;
        if !allowed(current, next) {
            return Ok(StatusTransition::Rejected { current });
        }

        self.check_writable()?;
        order.status = next;

        Ok(StatusTransition::Applied { previous: current })
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, StoreError> {
        let state = self.state.read().await;
        let orders = state.newest_first(|o| {
            o.user_id == user_id && status.map_or(true, |s| o.status == s)
        });

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: state.items_for(order.id),
                order,
            })
            .collect())
    }

    async fn order_summaries(
        &self,
        filter: OrderListFilter,
    ) -> Result<Vec<OrderSummary>, StoreError> {
        let state = self.state.read().await;
        let orders = state.newest_first(|o| filter.status.map_or(true, |s| o.status == s));

        Ok(orders
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(|order| OrderSummary {
                item_count: state.items.iter().filter(|i| i.order_id == order.id).count() as i64,
                order,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}
