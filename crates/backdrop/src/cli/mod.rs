//! Command implementations.

pub mod config;
pub mod replace;
pub mod serve;

use anyhow::Context;
use backdrop_core::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// Config file in use: the explicit one, or the platform default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path)
}

/// Load the explicit config file, or the default location if none was given.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Load the config for a command run.
///
/// An unreadable default config only warns and falls back to defaults. An
/// explicitly named file must load when `strict` is set.
pub fn load_or_default(explicit: Option<&Path>, strict: bool) -> anyhow::Result<Config> {
    match load_config(explicit) {
        Ok(config) => Ok(config),
        Err(e) => match explicit {
            Some(path) if strict => Err(e)
                .with_context(|| format!("Failed to load config file {}", path.display())),
            _ => {
                // Logging isn't initialized yet, so the warning goes through eprintln.
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `backdrop config path`."
                );
                Ok(Config::default())
            }
        },
    }
}
