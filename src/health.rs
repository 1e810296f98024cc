use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Health Check Abstractions
// ============================================================================
//
// Components report their own health; the HTTP layer aggregates the reports
// and picks the worst one as the overall status.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 2,
        }
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub components: Vec<ComponentHealth>,
    pub check_time: DateTime<Utc>,
    #[serde(skip)]
    pub overall_status: HealthStatus,
}

impl SystemHealth {
    pub const SERVICE_NAME: &'static str = "ghost-kitchen-orders";

    /// Overall status is the worst of the component statuses
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let overall_status = components
            .iter()
            .map(|c| &c.status)
            .max_by_key(|status| status.severity())
            .cloned()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status: overall_status.label(),
            service: Self::SERVICE_NAME,
            components,
            check_time: Utc::now(),
            overall_status,
        }
    }
}

/// Trait for components that can report their health status
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Get the component name
    fn component_name(&self) -> &str;

    /// Probe the component now
    async fn check_health(&self) -> ComponentHealth;
}
