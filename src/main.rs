use std::sync::Arc;
use std::time::Duration;

use medcenter_api::catalog::PgCatalog;
use medcenter_api::registry::PartitionRegistry;
use medcenter_api::server::{app, AppState};
use medcenter_api::store::postgres::PgStoreProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = medcenter_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting MedCenter API in {:?} mode", config.environment);

    let registry = Arc::new(PartitionRegistry::from_entries(config.sites.clone())?);
    tracing::info!(
        sites = registry.len(),
        catalog = registry.catalog_database(),
        "partition registry loaded"
    );

    let state = AppState::new(
        registry.clone(),
        Arc::new(PgStoreProvider::new()),
        Arc::new(PgCatalog::new(registry.catalog_database())),
        Duration::from_millis(config.federation.fanout_timeout_ms),
    );

    // Allow tests or deployments to override port via env
    let port = std::env::var("MEDCENTER_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("MedCenter API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
