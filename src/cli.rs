//! Command-line front-end.
//!
//! Backend failures are printed and the command still succeeds; only
//! argument errors and failures to write output end the process with a
//! non-zero status.

use std::io::Write;

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use futures::StreamExt;

use crate::gateway::Dispatcher;

/// MCP CLI - talk to chat and issue backends through one interface.
#[derive(Debug, Parser)]
#[command(name = "mcpcli", version, about)]
pub struct Cli {
    /// Name of the backend server (slack|github)
    #[arg(short, long, global = true, default_value = "")]
    pub server: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to a server
    Connect,
    /// List contexts on a server
    List,
    /// Send a message
    Send {
        /// Context/channel/repo
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        context: String,
        /// Message text
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        message: String,
    },
    /// Receive messages
    Recv {
        /// Context/channel/repo
        #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
        context: String,
    },
    /// List registered servers
    Servers,
}

/// Run one parsed command, writing user-facing lines to `out`
pub async fn run<W: Write>(cli: &Cli, dispatcher: &Dispatcher, out: &mut W) -> anyhow::Result<()> {
    if let Command::Servers = cli.command {
        for name in dispatcher.names() {
            writeln!(out, "{}", name)?;
        }
        return Ok(());
    }

    let server = match dispatcher.resolve(&cli.server) {
        Ok(server) => server,
        Err(e) => {
            writeln!(out, "{}", e)?;
            return Ok(());
        }
    };

    if let Err(e) = dispatcher.connect(&server).await {
        writeln!(out, "Connect error: {}", e)?;
        return Ok(());
    }

    match &cli.command {
        Command::Connect => writeln!(out, "Connected to {}", cli.server)?,
        Command::List => match server.list_contexts().await {
            Ok(contexts) => {
                for context in contexts {
                    writeln!(out, " - {}", context)?;
                }
            }
            Err(e) => writeln!(out, "List error: {}", e)?,
        },
        Command::Send { context, message } => match server.send_message(context, message).await {
            Ok(()) => writeln!(out, "Sent message to {}", context)?,
            Err(e) => writeln!(out, "Send error: {}", e)?,
        },
        Command::Recv { context } => match server.receive_message(context).await {
            Ok(mut stream) => {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(message) => writeln!(out, "{}", message)?,
                        Err(e) => writeln!(out, "Receive error: {}", e)?,
                    }
                }
            }
            Err(e) => writeln!(out, "Receive error: {}", e)?,
        },
        Command::Servers => {}
    }

    Ok(())
}
