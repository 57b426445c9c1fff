//! Backdrop CLI - replace the background of car photographs with AI.
//!
//! Backdrop wraps an external generative-image service in a resilient client
//! (bounded retries, per-attempt deadlines, jittered backoff) and exposes it
//! as an HTTP endpoint or a one-shot command.
//!
//! # Usage
//!
//! ```bash
//! # Serve POST /api/replace-background
//! backdrop serve --port 3000
//!
//! # One-shot replacement
//! backdrop replace --car car.png --prompt "misty mountain road" --output out.png
//!
//! # View configuration
//! backdrop config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;
mod server;

/// Backdrop - AI background replacement for car photographs.
#[derive(Parser, Debug)]
#[command(name = "backdrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "BACKDROP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP boundary
    Serve(cli::serve::ServeArgs),

    /// Replace the background of a single image
    Replace(cli::replace::ReplaceArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `config init` must work before the named file exists.
    let strict = !matches!(cli.command, Commands::Config(_));
    let config = cli::load_or_default(cli.config.as_deref(), strict)?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Backdrop v{}", backdrop_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Replace(args) => cli::replace::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
