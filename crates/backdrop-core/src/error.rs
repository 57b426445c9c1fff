//! Error types for Backdrop.
//!
//! `UpstreamError` is the failure surface of a single upstream attempt and is
//! what the retry classifier inspects. Configuration problems are reported
//! separately because they abort startup instead of failing a request.

use thiserror::Error;

/// Top-level error type for Backdrop operations.
#[derive(Error, Debug)]
pub enum BackdropError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A required credential is not set
    #[error("{name} is not set. Export it or set it in the config file.")]
    MissingCredential { name: String },
}

/// Failure of one upstream attempt.
///
/// Every variant exposes an optional HTTP status via [`UpstreamError::status_code`]
/// and a human-readable message via `Display`; classifiers only rely on those
/// two plus the deadline/empty-output markers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider answered with a non-success HTTP status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, reset connection, ...)
    #[error("{0}")]
    Transport(String),

    /// The per-attempt deadline fired before the provider answered
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A successful response carried no inline image part
    #[error("No image was generated in the response: {0}")]
    EmptyOutput(String),

    /// The response body could not be interpreted
    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    /// The attempt task failed without producing a result
    #[error("Upstream task failed: {0}")]
    Internal(String),
}

impl UpstreamError {
    /// HTTP status reported by the provider, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience type alias for Backdrop results.
pub type Result<T> = std::result::Result<T, BackdropError>;
