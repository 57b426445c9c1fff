//! Retry policy fixed for the lifetime of one invocation.

use super::backoff::Backoff;
use crate::config::RetryConfig;
use std::time::Duration;

/// Attempt budget, per-attempt deadline and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Deadline for each individual attempt
    pub attempt_timeout: Duration,
    /// Delay schedule between attempts
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            backoff: Backoff::new(
                config.base_delay_ms,
                config.max_delay_ms,
                config.jitter_ratio,
            ),
        }
    }
}
