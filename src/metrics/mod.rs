// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for the order engine
// ============================================================================
//
// Provides metrics for:
// - Order creation throughput and latency
// - Failures by error kind
// - Status changes by target status
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub order_failures: IntCounterVec,
    pub order_create_duration: Histogram,
    pub status_updates: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_failures_total", "Failed order operations by error kind"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let order_create_duration = Histogram::with_opts(
            HistogramOpts::new("order_create_duration_seconds", "Order creation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(order_create_duration.clone()))?;

        let status_updates = IntCounterVec::new(
            Opts::new("order_status_updates_total", "Applied order status changes"),
            &["status"],
        )?;
        registry.register(Box::new(status_updates.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_failures,
            order_create_duration,
            status_updates,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self, duration_secs: f64) {
        self.orders_created.inc();
        self.order_create_duration.observe(duration_secs);
    }

    pub fn record_failure(&self, operation: &str, kind: &str) {
        self.order_failures.with_label_values(&[operation, kind]).inc();
    }

    pub fn record_status_update(&self, status: &str) {
        self.status_updates.with_label_values(&[status]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_order_created() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created(0.02);
        metrics.record_order_created(0.03);

        let gathered = metrics.registry.gather();
        let created = gathered.iter().find(|m| m.name() == "orders_created_total").unwrap();
        assert_eq!(created.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_failure_by_kind() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure("create_order", "item_unavailable");
        metrics.record_failure("create_order", "invalid_request");
        metrics.record_failure("create_order", "invalid_request");

        let gathered = metrics.registry.gather();
        let failures = gathered.iter().find(|m| m.name() == "order_failures_total").unwrap();
        assert_eq!(failures.metric.len(), 2);
    }

    #[test]
    fn test_record_status_update() {
        let metrics = Metrics::new().unwrap();
        metrics.record_status_update("confirmed");

        let gathered = metrics.registry.gather();
        let updates = gathered
            .iter()
            .find(|m| m.name() == "order_status_updates_total")
            .unwrap();
        assert_eq!(updates.metric[0].counter.value, Some(1.0));
    }
}
