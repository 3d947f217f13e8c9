//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured level. The server writes
//! to stdout; the CLI writes to stderr so command output stays clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialise logging for the HTTP server
pub fn init_server(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(&config.level));

    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

/// Initialise stderr-only logging for one-shot CLI commands
pub fn init_cli(config: &LoggingConfig) {
    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
