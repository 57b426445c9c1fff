//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `level` - Default filter directive when `RUST_LOG` is not set.
/// * `json_format` - If true, outputs structured JSON logs; otherwise pretty-printed.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for command output)
/// - The RUST_LOG environment variable can override the log level
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        // JSON format for log shippers
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Pick the filter level from config, with `--verbose` forcing debug.
pub fn effective_level(config: &backdrop_core::Config, verbose_override: bool) -> String {
    if verbose_override {
        return "debug".to_string();
    }
    match config.logging.level.as_str() {
        level @ ("error" | "warn" | "info" | "debug" | "trace") => level.to_string(),
        _ => "info".to_string(),
    }
}

/// Initialize logging with settings from the Backdrop configuration.
pub fn init_from_config(
    config: &backdrop_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let json_format = json_logs_override || config.logging.format == "json";
    init(&effective_level(config, verbose_override), json_format);
}
