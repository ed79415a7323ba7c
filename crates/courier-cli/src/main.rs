//! `courier` -- CLI binary for the courier mail and web assistant.
//!
//! Provides the following subcommands:
//!
//! - `courier agent` -- Start an interactive session or send a single message.
//! - `courier auth` -- Grant (or re-grant) mailbox access through the browser.
//! - `courier status` -- Show configuration and credential status.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// courier mail and web assistant CLI.
#[derive(Parser)]
#[command(name = "courier", about = "courier mail and web assistant", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session or send a single message.
    Agent(commands::agent::AgentArgs),

    /// Authorize mailbox access (opens the browser).
    Auth(commands::auth::AuthArgs),

    /// Show configuration and credential status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Agent(args) => commands::agent::run(args, config).await?,
        Commands::Auth(args) => commands::auth::run(args, config).await?,
        Commands::Status => commands::status::run(config).await?,
    }

    Ok(())
}
