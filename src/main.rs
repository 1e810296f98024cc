use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ghost_kitchen_orders::api::{self, HeaderIdentityProvider, IdentityProvider};
use ghost_kitchen_orders::config::AppConfig;
use ghost_kitchen_orders::domain::order::OrderCommandHandler;
use ghost_kitchen_orders::metrics::Metrics;
use ghost_kitchen_orders::store::PgStore;
use ghost_kitchen_orders::utils::{retry_on_transient, RetryConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ghost_kitchen_orders=debug")),
        )
        .init();

    tracing::info!("Starting ghost kitchen order service");

    let config = AppConfig::from_env()?;

    // === 1. Database ===
    tracing::info!(max_connections = config.db_max_connections, "Connecting to Postgres");
    let store = retry_on_transient("Postgres", RetryConfig::startup(), |attempt| {
        tracing::debug!(attempt, "Opening connection pool");
        PgStore::connect(&config.database_url, config.db_max_connections)
    })
    .await
    .into_result()?;
    store.migrate().await?;
    let store = Arc::new(store);

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // === 3. Order engine ===
    let pricing = config.pricing();
    tracing::info!(
        delivery_fee = %pricing.delivery_fee,
        tax_rate = %pricing.tax_rate,
        "Pricing policy loaded"
    );
    let handler = web::Data::new(OrderCommandHandler::new(
        store.clone(),
        store,
        pricing,
        metrics.clone(),
    ));
    let identity: web::Data<dyn IdentityProvider> =
        web::Data::from(Arc::new(HeaderIdentityProvider) as Arc<dyn IdentityProvider>);
    let metrics = web::Data::from(metrics);

    // === 4. HTTP server ===
    let bind = (config.http_host.clone(), config.http_port);
    tracing::info!(host = %bind.0, port = bind.1, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(handler.clone())
            .app_data(identity.clone())
            .app_data(metrics.clone())
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
