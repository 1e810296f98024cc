// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - identity: the authenticated caller and its role
// - order:    pricing, validation and lifecycle of orders
//
// Nothing here knows about HTTP; persistence is reached through the
// traits in `crate::store`.
//
// ============================================================================

pub mod identity;
pub mod order;
