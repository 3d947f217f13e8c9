//! Common error types for the context gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown server: {0}")]
    UnknownServer(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("not connected to {0}, call connect first")]
    NotConnected(String),

    #[error("list contexts failed: {0}")]
    List(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("malformed context '{context}': {reason}")]
    MalformedContext { context: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a malformed context error
    pub fn malformed(context: &str, reason: impl Into<String>) -> Self {
        AppError::MalformedContext {
            context: context.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status used when this error reaches the API boundary.
    ///
    /// Caller mistakes (unknown backend, missing parameters) are 400, anything
    /// raised by a backend or the process itself is 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownServer(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
