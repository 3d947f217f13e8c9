//! Main entry point for the MCP REST API server

use anyhow::Context;
use mcps::{api, backend::registry::ServerRegistry, config::Settings, logging, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually live in .env during development
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;
    logging::init_server(&settings.logging);

    info!("Starting MCP REST API server");

    let registry = Arc::new(ServerRegistry::with_builtin(&settings)?);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let app_state = Arc::new(AppState::new(registry));
    let app = api::routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
