//! Route table for the HTTP API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/servers", get(handlers::list_servers))
        .route("/api/v1/:server/contexts", get(handlers::list_contexts))
        .route("/api/v1/:server/send", post(handlers::send_message))
        .route("/api/v1/:server/receive", get(handlers::receive_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
