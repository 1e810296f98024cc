use chrono::{DateTime, Utc};
use serde::Serialize;

use super::commands::ValidatedDelivery;
use super::pricing::{PricedCart, ResolvedLineItem};
use super::value_objects::{MenuItemId, Money, OrderId, OrderStatus, PaymentMethod, UserId};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// The order header is the aggregate root; line items belong to exactly one
// order. Both are written together or not at all. After creation only
// `status` changes.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub payment_method: PaymentMethod,
    pub special_instructions: Option<String>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn totals_balance(&self) -> bool {
        self.subtotal
            .checked_add(self.delivery_fee)
            .and_then(|sum| sum.checked_add(self.tax_amount))
            == Some(self.total_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
    #[serde(flatten)]
    pub details: MenuItemDetails,
}

/// Catalog display fields joined in on reads. Empty when the menu item has
/// since been removed; the priced columns above never depend on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MenuItemDetails {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub kitchen_name: Option<String>,
}

/// Header plus line items, as returned by order lookups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}

/// Header plus line count, as returned by the admin listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: i64,
}

/// A fully priced order that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub delivery: ValidatedDelivery,
    pub lines: Vec<ResolvedLineItem>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

impl NewOrder {
    pub fn new(user_id: UserId, delivery: ValidatedDelivery, priced: PricedCart) -> Self {
        Self {
            user_id,
            delivery,
            lines: priced.lines,
            subtotal: priced.subtotal,
            delivery_fee: priced.delivery_fee,
            tax_amount: priced.tax_amount,
            total_amount: priced.total_amount,
        }
    }

    /// Every new order starts out pending
    pub fn status(&self) -> OrderStatus {
        OrderStatus::Pending
    }

    /// Header as it will look once the store assigns identity and timestamp
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id: self.user_id,
            status: OrderStatus::Pending,
            delivery_address: self.delivery.address,
            delivery_phone: self.delivery.phone,
            payment_method: self.delivery.payment_method,
            special_instructions: self.delivery.special_instructions,
            scheduled_delivery: self.delivery.scheduled_delivery,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
            created_at,
        }
    }
}

/// Paging for the admin listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl OrderListFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Clamp the limit into `1..=MAX_LIMIT` and the offset to non-negative
    pub fn new(status: Option<OrderStatus>, limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            status,
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for OrderListFilter {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Outcome of an atomic status change attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Applied { previous: OrderStatus },
    Rejected { current: OrderStatus },
    Missing,
}
