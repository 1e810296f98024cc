use actix_web::{web, HttpResponse};
use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::domain::order::OrderCommandHandler;
use crate::health::{ComponentHealth, HealthCheckable, HealthStatus, SystemHealth};
use crate::store::StoreError;

/// Round-trips slower than this report the store as degraded
const SLOW_PING: Duration = Duration::from_millis(500);

/// Only fixed reasons leave this module; store errors stay in the logs
fn store_status(ping: Result<(), StoreError>, elapsed: Duration) -> HealthStatus {
    match ping {
        Err(e) => {
            tracing::warn!(error = %e, "Order store health check failed");
            HealthStatus::Unhealthy("order store unreachable".to_string())
        }
        Ok(()) if elapsed > SLOW_PING => {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Order store slow to respond");
            HealthStatus::Degraded("order store slow to respond".to_string())
        }
        Ok(()) => HealthStatus::Healthy,
    }
}

#[async_trait]
impl HealthCheckable for OrderCommandHandler {
    fn component_name(&self) -> &str {
        "order_store"
    }

    async fn check_health(&self) -> ComponentHealth {
        let started = Instant::now();
        let ping = self.ping_store().await;

        ComponentHealth::new(self.component_name(), store_status(ping, started.elapsed()))
    }
}

pub async fn health(handler: web::Data<OrderCommandHandler>) -> HttpResponse {
    let health = SystemHealth::from_components(vec![handler.check_health().await]);

    if health.overall_status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(&health)
    } else {
        HttpResponse::Ok().json(&health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_status_by_latency() {
        assert_eq!(store_status(Ok(()), Duration::from_millis(3)), HealthStatus::Healthy);
        assert!(matches!(
            store_status(Ok(()), Duration::from_secs(2)),
            HealthStatus::Degraded(_)
        ));
    }

    #[test]
    fn test_store_error_is_not_echoed() {
        let status = store_status(
            Err(StoreError::Unavailable("db.internal:5432 refused".to_string())),
            Duration::from_millis(1),
        );

        assert_eq!(status, HealthStatus::Unhealthy("order store unreachable".to_string()));
    }
}
