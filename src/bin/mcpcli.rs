//! MCP CLI entry point.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use mcps::backend::registry::ServerRegistry;
use mcps::cli::{self, Cli};
use mcps::config::Settings;
use mcps::gateway::Dispatcher;
use mcps::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;
    logging::init_cli(&settings.logging);

    let registry = Arc::new(ServerRegistry::with_builtin(&settings)?);
    let dispatcher = Dispatcher::new(registry);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::run(&cli, &dispatcher, &mut out).await?;
    out.flush()?;
    Ok(())
}
