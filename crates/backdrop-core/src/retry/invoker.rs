//! Bounded-retry invocation of the upstream provider.
//!
//! Attempts run strictly one after another. Each attempt is wrapped in a
//! [`DeadlineGuard`]; failures are classified, retryable ones are followed by
//! a backoff sleep until the attempt budget is spent.

use super::classify::{ErrorClassifier, PredicateClassifier};
use super::deadline::DeadlineGuard;
use super::policy::RetryPolicy;
use crate::error::UpstreamError;
use crate::outcome::{AttemptRecord, AttemptStatus, CallOutcome, ErrorKind};
use crate::request::{decode_base64, CallRequest};
use crate::upstream::{GenerateRequest, GenerateResponse, ImageProvider};
use std::sync::Arc;
use tokio::time::Instant;

/// Runs one background replacement with retries.
pub struct RetryingInvoker {
    provider: Arc<dyn ImageProvider>,
    classifier: Arc<dyn ErrorClassifier>,
    policy: RetryPolicy,
}

impl RetryingInvoker {
    /// Create an invoker using the default predicate classifier.
    pub fn new(provider: Arc<dyn ImageProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            classifier: Arc::new(PredicateClassifier::default()),
            policy,
        }
    }

    /// Replace the error classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    /// Run the request to a single terminal outcome.
    pub async fn invoke(&self, request: &CallRequest) -> CallOutcome {
        let start = Instant::now();

        if let Err(message) = request.validate() {
            tracing::warn!("Rejecting request before any upstream call: {message}");
            return CallOutcome::failure(ErrorKind::Validation, message, elapsed_ms(start), 0);
        }

        let upstream_request = Arc::new(GenerateRequest::replace_background(request));
        let guard = DeadlineGuard::new(self.policy.attempt_timeout);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracing::info!(
                "Generating image via {} - attempt {attempt}/{max_attempts}",
                self.provider.name()
            );
            let attempt_start = Instant::now();

            let provider = self.provider.clone();
            let call = upstream_request.clone();
            let result = guard
                .run(async move { provider.generate(&call).await })
                .await
                .and_then(extract_image);

            let error = match result {
                Ok(image) => {
                    let record =
                        AttemptRecord::finish(attempt, attempt_start, AttemptStatus::Succeeded);
                    tracing::info!(
                        "Attempt {}/{max_attempts} {} in {}ms",
                        record.index,
                        record.status,
                        record.elapsed.as_millis()
                    );
                    return CallOutcome::Success {
                        image,
                        total_elapsed_ms: elapsed_ms(start),
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            let verdict = self.classifier.classify(&error);
            let status = if verdict.retryable {
                AttemptStatus::RetryableFailure
            } else {
                AttemptStatus::FatalFailure
            };
            let record = AttemptRecord::finish(attempt, attempt_start, status);
            tracing::warn!(
                "Attempt {}/{max_attempts} {} after {}ms ({}): {error}",
                record.index,
                record.status,
                record.elapsed.as_millis(),
                verdict.kind
            );

            if let UpstreamError::EmptyOutput(reason) = &error {
                // May be a content-policy rejection rather than a transient glitch.
                tracing::warn!("Upstream produced no image ({reason}); counting it as retryable");
            }

            if !verdict.retryable {
                tracing::error!("Non-retryable error ({}): {error}", verdict.http_status());
                return CallOutcome::failure(
                    verdict.kind,
                    error.to_string(),
                    elapsed_ms(start),
                    attempt,
                );
            }

            if attempt >= max_attempts {
                tracing::error!("All {max_attempts} attempts failed, last error: {error}");
                return CallOutcome::failure(
                    verdict.kind,
                    error.to_string(),
                    elapsed_ms(start),
                    attempt,
                );
            }

            let delay = self.policy.backoff.delay(attempt);
            tracing::info!("Waiting {}ms before attempt {}", delay.as_millis(), attempt + 1);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Pull the image bytes out of a structurally valid response.
fn extract_image(response: GenerateResponse) -> Result<Vec<u8>, UpstreamError> {
    let inline = response
        .first_inline_image()
        .map_err(UpstreamError::EmptyOutput)?;
    decode_base64(&inline.data)
        .map_err(|e| UpstreamError::Malformed(format!("inline image is not valid base64: {e}")))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
