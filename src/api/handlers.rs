//! Request handlers.
//!
//! Every backend route resolves `{server}` first, then validates its query
//! parameters, then connects with an empty config before touching the backend.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use futures::{future, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Query string of the send and receive routes
#[derive(Debug, Default, Deserialize)]
pub struct ContextParams {
    pub context: Option<String>,
    pub message: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn lines<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().map(|item| format!("{}\n", item)).collect()
}

pub async fn health() -> &'static str {
    "OK"
}

/// `GET /api/v1/servers`
pub async fn list_servers(State(state): State<Arc<AppState>>) -> String {
    lines(state.dispatcher.names())
}

/// `GET /api/v1/{server}/contexts`
pub async fn list_contexts(
    State(state): State<Arc<AppState>>,
    Path(server): Path<String>,
) -> Result<String> {
    let backend = state.dispatcher.resolve(&server)?;
    state.dispatcher.connect(&backend).await?;

    let contexts = backend.list_contexts().await?;
    debug!(server = %server, count = contexts.len(), "Listed contexts");
    Ok(lines(contexts))
}

/// `POST /api/v1/{server}/send?context=C&message=M`
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(server): Path<String>,
    Query(params): Query<ContextParams>,
) -> Result<&'static str> {
    let backend = state.dispatcher.resolve(&server)?;
    let (context, message) = match (present(params.context), present(params.message)) {
        (Some(context), Some(message)) => (context, message),
        _ => return Err(AppError::InvalidRequest("Missing context or message".to_string())),
    };
    state.dispatcher.connect(&backend).await?;

    backend.send_message(&context, &message).await?;
    Ok("OK")
}

/// `GET /api/v1/{server}/receive?context=C`
///
/// Streams one `[time] user: text` line per message. A failure while the
/// backend is still fetching ends the body early, since the status line has
/// already gone out.
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    Path(server): Path<String>,
    Query(params): Query<ContextParams>,
) -> Result<Response> {
    let backend = state.dispatcher.resolve(&server)?;
    let context = present(params.context)
        .ok_or_else(|| AppError::InvalidRequest("Missing context".to_string()))?;
    state.dispatcher.connect(&backend).await?;

    let stream = backend.receive_message(&context).await?;
    let body = stream
        .scan((), move |_, item| {
            future::ready(match item {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(server = %server, context = %context, error = %e, "Receive stream ended with error");
                    None
                }
            })
        })
        .map(|message| Ok::<_, Infallible>(format!("{}\n", message)));

    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(body)).into_response())
}
