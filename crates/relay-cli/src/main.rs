//! telegram-relay - lets an MCP agent talk to a human over Telegram.
//!
//! `serve` (the default) runs the MCP server over stdio or HTTP while
//! relaying chat traffic; `verify` checks that the bot and chat work.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_config::{Overrides, TransportMode};

mod commands;

/// Telegram relay for MCP agents
#[derive(Debug, Parser)]
#[command(name = "telegram-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Run the relay (default)
    Serve {
        /// MCP transport: stdio or http
        #[arg(short, long)]
        transport: Option<TransportMode>,

        /// HTTP port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check bot connectivity and exit
    Verify,
}

impl Default for Commands {
    fn default() -> Self {
        Self::Serve {
            transport: None,
            port: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command.unwrap_or_default() {
        Commands::Serve { transport, port } => {
            commands::serve::run(config, Overrides { transport, port }).await?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Verify => {
            let passed = commands::verify::run(config).await?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        },
    }
}
