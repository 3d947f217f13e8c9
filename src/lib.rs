//! MCP context gateway
//!
//! Treats heterogeneous messaging backends (Slack channels, GitHub issue
//! comments) as interchangeable contexts that can be listed, written to and
//! read from, through either a CLI or an HTTP API.

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::registry::ServerRegistry;
use gateway::Dispatcher;

/// Application state shared across all handlers
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
        }
    }
}
