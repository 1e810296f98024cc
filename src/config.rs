use anyhow::{anyhow, Context, Result};
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};

use crate::domain::order::{Money, PricingPolicy, TaxRate};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read once at startup from the environment. Optional keys fall back to
// defaults; a value that is present but unparsable aborts startup.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub db_max_connections: u32,
    pub delivery_fee: Money,
    pub tax_rate: TaxRate,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            http_host: try_load(&lookup, "HTTP_HOST", "0.0.0.0")?,
            http_port: try_load(&lookup, "HTTP_PORT", "3001")?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            delivery_fee: try_load(&lookup, "DELIVERY_FEE", "40.00")?,
            tax_rate: try_load(&lookup, "TAX_RATE", "0.05")?,
        })
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(self.delivery_fee, self.tax_rate)
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            anyhow!("{e}")
        })
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}
