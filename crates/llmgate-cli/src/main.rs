//! llmgate CLI: entry point.
//!
//! # Commands
//!
//! - `llmgate serve [--config PATH] [--logs]`: run the HTTP gateway
//! - `llmgate status [--config PATH]`: show configuration and backends
//! - `llmgate init [--config PATH] [--force]`: write the default config file

mod helpers;
mod init;
mod serve;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// llmgate: one HTTP endpoint in front of many LLM backends
#[derive(Parser)]
#[command(name = "llmgate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway
    Serve {
        /// Config file (defaults to ~/.llmgate/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and registered backends
    Status {
        /// Config file (defaults to ~/.llmgate/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration file
    Init {
        /// Config file (defaults to ~/.llmgate/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, logs } => serve::run(config.as_deref(), logs).await,
        Commands::Status { config } => status::run(config.as_deref()),
        Commands::Init { config, force } => init::run(config.as_deref(), force),
    }
}
