//! Catalog Server
//!
//! A REST API over a catalog of items kept in a single JSON document:
//! - Search, legacy limit and paginated listing over a stable item order
//! - Single item lookup and creation with generated ids
//! - Aggregate statistics cached until the document changes on disk
//! - Change detection that sees every writer, not just this server

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod items;
mod query;
mod stats;
mod storage;
mod watcher;

use api::AppState;
use config::ServerConfig;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env().context("Failed to read configuration")?;

    info!("Serving items from: {}", config.data_path.display());

    // Create application state; the document watcher is established here
    let state = Arc::new(AppState::new(&config));

    // Start background tasks
    let background_handles = state.start_background_tasks();

    let app = api::router(state.clone());
    let addr = config.socket_addr();

    info!("Catalog server v{} starting", env!("CARGO_PKG_VERSION"));
    info!("   Listening on: http://{}", addr);
    info!("   Items: http://{}/api/items", addr);
    info!("   Stats: http://{}/api/stats", addr);
    info!("   Query parameter policy: {:?}", config.param_policy);
    info!("   Item validation: {:?}", config.validation);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.shutdown();
    background_handles.wait().await;
    info!("Catalog server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
