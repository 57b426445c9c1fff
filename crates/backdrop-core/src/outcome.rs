//! Terminal and per-attempt results of an invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stable, machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    #[serde(rename = "SERVICE_UNAVAILABLE")]
    ServiceUnavailable,
    #[serde(rename = "AUTH_ERROR")]
    Auth,
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    #[serde(rename = "PROCESSING_ERROR")]
    Processing,
    #[serde(rename = "VALIDATION")]
    Validation,
}

impl ErrorKind {
    /// Code string exposed at the boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Auth => "AUTH_ERROR",
            Self::RateLimit => "RATE_LIMIT_ERROR",
            Self::Processing => "PROCESSING_ERROR",
            Self::Validation => "VALIDATION",
        }
    }

    /// HTTP status returned with this code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Timeout => 408,
            Self::ServiceUnavailable => 503,
            Self::Auth => 401,
            Self::RateLimit => 429,
            Self::Processing => 500,
            Self::Validation => 400,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of one invocation, produced exactly once and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success {
        image: Vec<u8>,
        total_elapsed_ms: u64,
        attempts: u32,
    },
    Failure {
        kind: ErrorKind,
        http_status: u16,
        message: String,
        total_elapsed_ms: u64,
        attempts: u32,
    },
}

impl CallOutcome {
    /// Failure whose HTTP status follows from its kind.
    pub fn failure(
        kind: ErrorKind,
        message: impl Into<String>,
        total_elapsed_ms: u64,
        attempts: u32,
    ) -> Self {
        Self::Failure {
            kind,
            http_status: kind.http_status(),
            message: message.into(),
            total_elapsed_ms,
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        match self {
            Self::Success {
                total_elapsed_ms, ..
            }
            | Self::Failure {
                total_elapsed_ms, ..
            } => *total_elapsed_ms,
        }
    }

    /// Upstream calls made to produce this outcome.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    /// Failure kind, or `None` on success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Succeeded,
    RetryableFailure,
    FatalFailure,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "succeeded",
            Self::RetryableFailure => "retryable failure",
            Self::FatalFailure => "fatal failure",
        })
    }
}

/// Bookkeeping for one attempt; logged and then dropped.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based attempt index
    pub index: u32,
    pub started_at: tokio::time::Instant,
    pub status: AttemptStatus,
    pub elapsed: Duration,
}

impl AttemptRecord {
    pub fn finish(index: u32, started_at: tokio::time::Instant, status: AttemptStatus) -> Self {
        Self {
            index,
            started_at,
            status,
            elapsed: started_at.elapsed(),
        }
    }
}
