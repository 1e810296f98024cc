use super::value_objects::{MenuItemId, OrderStatus};
use crate::store::StoreError;

// ============================================================================
// Order Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Menu item with ID {0} not found or unavailable")]
    ItemUnavailable(MenuItemId),

    #[error("Access denied. No caller identity provided.")]
    Unauthorized,

    #[error("Access denied. Admin role required.")]
    Forbidden,

    #[error("Order not found")]
    NotFound,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Cannot change status of a {0} order")]
    InvalidStatusTransition(OrderStatus),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl OrderError {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest(_) => "invalid_request",
            OrderError::ItemUnavailable(_) => "item_unavailable",
            OrderError::Unauthorized => "unauthorized",
            OrderError::Forbidden => "forbidden",
            OrderError::NotFound => "not_found",
            OrderError::InvalidStatus(_) | OrderError::InvalidStatusTransition(_) => {
                "invalid_status"
            }
            OrderError::Persistence(_) => "persistence",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        OrderError::InvalidRequest(message.into())
    }
}
