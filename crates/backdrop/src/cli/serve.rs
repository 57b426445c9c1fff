//! The `backdrop serve` command.

use crate::server::{self, AppState};
use backdrop_core::{Backdrop, Config};
use clap::Args;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides `[server] bind_address`)
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides `[server] port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = config.server.socket_addr();
    let max_concurrent = config.server.max_concurrent;
    let max_body_mb = config.server.max_body_mb;

    let backdrop = Backdrop::new(config)?;
    tracing::info!(
        max_attempts = backdrop.config().retry.max_attempts,
        attempt_timeout_ms = backdrop.config().retry.attempt_timeout_ms,
        max_concurrent,
        "Starting Backdrop server"
    );

    let state = AppState::new(backdrop.replacer(), max_concurrent);
    server::run(state, &addr, max_body_mb).await
}
