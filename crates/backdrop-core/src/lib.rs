//! Backdrop Core - resilient client for AI background replacement.
//!
//! Wraps a single generative-image provider (Google Gemini) in a bounded-retry,
//! deadline-guarded, jittered-backoff invoker and maps every run to a stable
//! response contract.
//!
//! # Architecture
//!
//! ```text
//! request → RetryingInvoker → (DeadlineGuard → ImageProvider)
//!                ↑ ErrorClassifier / Backoff ↓
//!           CallOutcome → ResponseMapper → JSON + HTTP status
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use backdrop_core::{Backdrop, Config, ReplaceBackgroundRequest};
//!
//! #[tokio::main]
//! async fn main() -> backdrop_core::Result<()> {
//!     let backdrop = Backdrop::new(Config::load()?)?;
//!     let response = backdrop
//!         .replacer()
//!         .replace(ReplaceBackgroundRequest {
//!             car_image_b64: Some(car_b64),
//!             background_image_b64: None,
//!             prompt: Some("a neon-lit street at night".into()),
//!         })
//!         .await;
//!     println!("HTTP {}", response.status);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod outcome;
pub mod replacer;
pub mod request;
pub mod response;
pub mod retry;
pub mod upstream;

// Re-exports for convenient access
pub use config::Config;
pub use error::{BackdropError, ConfigError, Result, UpstreamError};
pub use outcome::{AttemptRecord, AttemptStatus, CallOutcome, ErrorKind};
pub use replacer::BackgroundReplacer;
pub use request::{CallRequest, ImagePayload, ReplaceBackgroundRequest};
pub use response::{map_outcome, map_outcome_at, BoundaryResponse, ResponseBody};
pub use retry::{
    Backoff, ErrorClassifier, PredicateClassifier, RetryPolicy, RetryPredicate, RetryingInvoker,
};
pub use upstream::{create_provider, ImageProvider};

use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fully wired service: provider, classifier and policy built from config.
pub struct Backdrop {
    config: Config,
    replacer: Arc<BackgroundReplacer>,
}

impl Backdrop {
    /// Build the service from configuration.
    ///
    /// Fails if the configuration is invalid or the provider credential is
    /// missing; both are startup errors, not per-request ones.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(&config.gemini)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Build the service around an explicitly supplied provider.
    pub fn with_provider(config: Config, provider: Arc<dyn ImageProvider>) -> Self {
        tracing::debug!(
            "Initializing Backdrop v{} with provider {}",
            VERSION,
            provider.name()
        );
        let invoker = RetryingInvoker::new(provider, RetryPolicy::from(&config.retry))
            .with_classifier(Arc::new(PredicateClassifier::from_config(&config.retry)));
        Self {
            config,
            replacer: Arc::new(BackgroundReplacer::new(invoker)),
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the replacer, cheap to clone into request handlers.
    pub fn replacer(&self) -> Arc<BackgroundReplacer> {
        self.replacer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_new_rejects_missing_credential() {
        let mut config = Config::default();
        config.gemini.api_key = "${DEFINITELY_NOT_SET_BACKDROP_LIB_KEY}".to_string();
        assert!(matches!(
            Backdrop::new(config),
            Err(BackdropError::Config(ConfigError::MissingCredential { .. }))
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.gemini.api_key = "literal-key".to_string();
        config.retry.max_attempts = 0;
        assert!(matches!(
            Backdrop::new(config),
            Err(BackdropError::Config(ConfigError::ValidationError(_)))
        ));
    }

    #[test]
    fn test_policy_follows_config() {
        let mut config = Config::default();
        config.gemini.api_key = "literal-key".to_string();
        config.retry.max_attempts = 5;
        let backdrop = Backdrop::new(config).unwrap();
        assert_eq!(backdrop.replacer().invoker().policy().max_attempts, 5);
        assert_eq!(backdrop.replacer().invoker().provider().name(), "gemini");
    }
}
