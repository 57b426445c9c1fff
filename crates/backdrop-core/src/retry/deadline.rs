//! Per-attempt deadline.
//!
//! The operation runs as its own tokio task and is raced against a timer.
//! When the timer wins, the task handle is dropped: the task is detached, not
//! aborted, so a slow upstream call may still finish in the background and
//! its result is discarded. Callers that need to bound that work must cap
//! concurrent invocations at a higher layer.

use crate::error::UpstreamError;
use std::future::Future;
use std::time::Duration;

/// Races an operation against a fixed wall-clock timeout.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    timeout: Duration,
}

impl DeadlineGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `operation`, failing with [`UpstreamError::Timeout`] if it does not
    /// finish within the deadline.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>> + Send + 'static,
        T: Send + 'static,
    {
        let timeout_ms = self.timeout.as_millis() as u64;
        let mut handle = tokio::spawn(operation);

        tokio::select! {
            biased;
            joined = &mut handle => match joined {
                Ok(result) => result,
                Err(e) => Err(UpstreamError::Internal(e.to_string())),
            },
            _ = tokio::time::sleep(self.timeout) => {
                tracing::debug!("Deadline of {timeout_ms}ms hit, abandoning in-flight call");
                drop(handle);
                Err(UpstreamError::Timeout { timeout_ms })
            }
        }
    }
}
