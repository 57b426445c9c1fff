//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be > 0".into(),
            ));
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempt_timeout_ms must be > 0".into(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.base_delay_ms must be <= retry.max_delay_ms".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigError::ValidationError(
                "retry.jitter_ratio must be between 0.0 and 1.0".into(),
            ));
        }
        if self.server.max_concurrent == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_concurrent must be > 0".into(),
            ));
        }
        if self.server.max_body_mb == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_mb must be > 0".into(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gemini.model must not be empty".into(),
            ));
        }
        Ok(())
    }
}
