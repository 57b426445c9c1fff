//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// HTTP boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum replacement requests in flight at once
    pub max_concurrent: usize,

    /// Maximum accepted request body in megabytes (base64 photos are large)
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            max_concurrent: 8,
            max_body_mb: 25,
        }
    }
}

impl ServerConfig {
    /// Full bind address (ip:port).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Retry, backoff and deadline settings for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,

    /// Backoff before the second attempt, doubled for every further attempt
    pub base_delay_ms: u64,

    /// Ceiling for the exponential part of the backoff
    pub max_delay_ms: u64,

    /// Deadline for a single upstream attempt
    pub attempt_timeout_ms: u64,

    /// Upper bound of the random jitter, as a fraction of the delay
    pub jitter_ratio: f64,

    /// HTTP statuses worth retrying
    pub retryable_statuses: Vec<u16>,

    /// Case-insensitive message fragments worth retrying
    pub retryable_patterns: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5000,
            max_delay_ms: 30_000,
            attempt_timeout_ms: 60_000,
            jitter_ratio: 0.3,
            retryable_statuses: vec![429, 502, 503, 504],
            retryable_patterns: vec![
                "timeout".to_string(),
                "network".to_string(),
                "connection".to_string(),
            ],
        }
    }
}

/// Gemini image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Image-capable model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-2.5-flash-image-preview".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
