//! Boundary orchestration for background replacement.
//!
//! Decodes the JSON request, hands it to the retrying invoker and maps the
//! outcome to the response contract. Always produces a response; nothing is
//! propagated as a Rust error.

use crate::outcome::{CallOutcome, ErrorKind};
use crate::request::{CallRequest, ReplaceBackgroundRequest};
use crate::response::{map_outcome, BoundaryResponse};
use crate::retry::RetryingInvoker;
use tokio::time::Instant;

/// Replaces car photo backgrounds through a [`RetryingInvoker`].
pub struct BackgroundReplacer {
    invoker: RetryingInvoker,
}

impl BackgroundReplacer {
    pub fn new(invoker: RetryingInvoker) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &RetryingInvoker {
        &self.invoker
    }

    /// Handle one boundary request and return the terminal outcome.
    ///
    /// The elapsed time covers decoding as well as all upstream attempts.
    pub async fn run(&self, request: ReplaceBackgroundRequest) -> CallOutcome {
        let start = Instant::now();
        tracing::info!("Starting background replacement request");

        let outcome = match CallRequest::from_boundary(request) {
            Ok(call) => with_elapsed(self.invoker.invoke(&call).await, start),
            Err(message) => {
                tracing::warn!("Rejecting request: {message}");
                CallOutcome::failure(
                    ErrorKind::Validation,
                    message,
                    start.elapsed().as_millis() as u64,
                    0,
                )
            }
        };

        match &outcome {
            CallOutcome::Success {
                total_elapsed_ms, ..
            } => {
                tracing::info!("Background replacement completed in {total_elapsed_ms}ms");
            }
            CallOutcome::Failure {
                kind,
                message,
                total_elapsed_ms,
                ..
            } => {
                tracing::error!(
                    "Background replacement failed after {total_elapsed_ms}ms ({kind}): {message}"
                );
            }
        }

        outcome
    }

    /// Handle one boundary request and map it to the response contract.
    pub async fn replace(&self, request: ReplaceBackgroundRequest) -> BoundaryResponse {
        map_outcome(&self.run(request).await)
    }
}

fn with_elapsed(outcome: CallOutcome, start: Instant) -> CallOutcome {
    let elapsed = start.elapsed().as_millis() as u64;
    match outcome {
        CallOutcome::Success {
            image, attempts, ..
        } => CallOutcome::Success {
            image,
            total_elapsed_ms: elapsed,
            attempts,
        },
        CallOutcome::Failure {
            kind,
            http_status,
            message,
            attempts,
            ..
        } => CallOutcome::Failure {
            kind,
            http_status,
            message,
            total_elapsed_ms: elapsed,
            attempts,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::response::ResponseBody;
    use crate::retry::RetryPolicy;
    use crate::upstream::{GenerateRequest, GenerateResponse, ImageProvider, RequestPart};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records every request and answers from a fixed script.
    struct RecordingProvider {
        calls: AtomicU32,
        seen: Mutex<Vec<GenerateRequest>>,
        fail_first_with: Option<UpstreamError>,
    }

    impl RecordingProvider {
        fn new(fail_first_with: Option<UpstreamError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
                fail_first_with,
            })
        }
    }

    #[async_trait]
    impl ImageProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, UpstreamError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            match (&self.fail_first_with, idx) {
                (Some(error), 0) => Err(error.clone()),
                _ => Ok(GenerateResponse::with_image("image/png", "ABCD")),
            }
        }
    }

    fn replacer(provider: Arc<RecordingProvider>) -> BackgroundReplacer {
        BackgroundReplacer::new(RetryingInvoker::new(provider, RetryPolicy::default()))
    }

    fn boundary(
        car: Option<&str>,
        background: Option<&str>,
        prompt: Option<&str>,
    ) -> ReplaceBackgroundRequest {
        ReplaceBackgroundRequest {
            car_image_b64: car.map(String::from),
            background_image_b64: background.map(String::from),
            prompt: prompt.map(String::from),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_success_returns_image() {
        let provider = RecordingProvider::new(None);
        let response = replacer(provider.clone())
            .replace(boundary(Some("AQID"), None, Some("rainy Tokyo street")))
            .await;

        assert_eq!(response.status, 200);
        match response.body {
            ResponseBody::Success { image, .. } => assert_eq!(image, "ABCD"),
            other => panic!("expected success, got {other:?}"),
        }

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].parts.len(), 2);
        assert!(matches!(
            &seen[0].parts[1],
            RequestPart::Text(text) if text.contains("rainy Tokyo street")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_image_is_forwarded() {
        let provider = RecordingProvider::new(None);
        replacer(provider.clone())
            .replace(boundary(Some("AQID"), Some("BAUG"), Some("desert")))
            .await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].parts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_fields_never_reach_upstream() {
        let provider = RecordingProvider::new(None);
        let replacer = replacer(provider.clone());

        for request in [
            boundary(None, None, Some("beach")),
            boundary(Some("AQID"), None, None),
            boundary(Some("AQID"), None, Some("")),
        ] {
            let response = replacer.replace(request).await;
            assert_eq!(response.status, 400);
            match response.body {
                ResponseBody::Failure { code, .. } => assert_eq!(code, ErrorKind::Validation),
                other => panic!("expected validation failure, got {other:?}"),
            }
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_base64_is_validation() {
        let provider = RecordingProvider::new(None);
        let outcome = replacer(provider.clone())
            .run(boundary(Some("@@not-base64@@"), None, Some("beach")))
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_time_covers_retries() {
        let provider = RecordingProvider::new(Some(UpstreamError::Http {
            status: 503,
            message: "Gemini HTTP 503: overloaded".to_string(),
        }));
        let response = replacer(provider.clone())
            .replace(boundary(Some("AQID"), None, Some("snow")))
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        match response.body {
            ResponseBody::Success { metadata, .. } => {
                assert!(metadata.processing_time >= 5000);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
