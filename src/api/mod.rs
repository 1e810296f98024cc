// ============================================================================
// HTTP API
// ============================================================================
//
// Routes (all under /api):
//   POST /orders              create an order from a cart
//   GET  /orders/user         caller's own orders
//   GET  /orders/admin        all orders (admin)
//   GET  /orders/{id}         one order with its items
//   PUT  /orders/{id}/status  change status (admin)
//   GET  /health              store reachability
// plus GET /metrics for Prometheus.
//
// Expected app data: Data<OrderCommandHandler>, Data<dyn IdentityProvider>,
// Data<Metrics>.
//
// ============================================================================

mod error;
mod health;
mod identity;
mod orders;

use actix_web::web;

use crate::metrics::metrics_handler;

pub use error::api_not_found;
pub use identity::{HeaderIdentityProvider, IdentityProvider, USER_ID_HEADER, USER_ROLE_HEADER};
pub use orders::{AdminOrdersQuery, CreateOrderRequest, UpdateStatusRequest, UserOrdersQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health::health))
                .service(
                    web::scope("/orders")
                        .route("", web::post().to(orders::create_order))
                        .route("/user", web::get().to(orders::list_user_orders))
                        .route("/admin", web::get().to(orders::list_admin_orders))
                        .route("/{id}", web::get().to(orders::get_order))
                        .route("/{id}/status", web::put().to(orders::update_order_status)),
                )
                .default_service(web::to(api_not_found)),
        )
        .route("/metrics", web::get().to(metrics_handler));
}

// ============================================================================
// HTTP Tests
// ============================================================================
