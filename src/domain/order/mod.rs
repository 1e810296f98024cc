// ============================================================================
// Order Domain - Pricing & Creation Engine
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (Money, TaxRate, OrderStatus, PaymentMethod, CartLine)
// - Commands (PlaceOrder and its validation)
// - Pricing (catalog snapshot → priced cart)
// - Errors (OrderError enum)
// - Aggregate (Order header, line items, listing views)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod pricing;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use pricing::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
