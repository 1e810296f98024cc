// ============================================================================
// Store Layer - Catalog and Order Persistence
// ============================================================================
//
// Storage traits the order engine depends on, with two implementations:
// - postgres: sqlx-backed, transactional
// - memory:   in-process, same atomicity guarantees, used by tests
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::order::{
    CatalogPrice, MenuItemId, NewOrder, Order, OrderId, OrderLineItem, OrderListFilter,
    OrderStatus, OrderSummary, OrderWithItems, StatusTransition, UserId,
};
use crate::utils::IsTransient;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            StoreError::Unavailable(_) => true,
            StoreError::Migration(_) | StoreError::Corrupt(_) => false,
        }
    }
}

/// Read-only view of menu item prices
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Prices for all requested ids, read from a single snapshot.
    /// Ids that do not exist are absent from the map.
    async fn menu_item_prices(
        &self,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, CatalogPrice>, StoreError>;

    async fn menu_item_price(&self, id: MenuItemId) -> Result<Option<CatalogPrice>, StoreError> {
        let mut prices = self.menu_item_prices(&[id]).await?;
        Ok(prices.remove(&id))
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert header and line items atomically
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>, StoreError>;

    /// Change status under a row lock if `allowed(current, next)` holds
    async fn transition_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        allowed: fn(OrderStatus, OrderStatus) -> bool,
    ) -> Result<StatusTransition, StoreError>;

    /// A user's orders with their line items, newest first
    async fn orders_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, StoreError>;

    /// All orders with their line counts, newest first
    async fn order_summaries(&self, filter: OrderListFilter)
        -> Result<Vec<OrderSummary>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
