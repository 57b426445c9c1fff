//! Mapping of terminal outcomes to the boundary response contract.
//!
//! Success bodies carry the base64 image plus timing metadata; failure bodies
//! carry a human-readable message, a stable code and the elapsed time. The
//! HTTP status always follows from the code.

use crate::outcome::{CallOutcome, ErrorKind};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Milliseconds spent on the whole request
    pub processing_time: u64,
    /// ISO-8601 completion time
    pub timestamp: String,
}

/// JSON body returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success {
        image: String,
        metadata: ResponseMetadata,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        error: String,
        code: ErrorKind,
        processing_time: u64,
    },
}

/// Body plus the HTTP status it is sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl BoundaryResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Success { .. })
    }
}

/// Map an outcome, stamping the current time.
pub fn map_outcome(outcome: &CallOutcome) -> BoundaryResponse {
    map_outcome_at(outcome, Utc::now())
}

/// Map an outcome with an explicit completion timestamp.
pub fn map_outcome_at(outcome: &CallOutcome, now: DateTime<Utc>) -> BoundaryResponse {
    match outcome {
        CallOutcome::Success {
            image,
            total_elapsed_ms,
            ..
        } => BoundaryResponse {
            status: 200,
            body: ResponseBody::Success {
                image: base64::engine::general_purpose::STANDARD.encode(image),
                metadata: ResponseMetadata {
                    processing_time: *total_elapsed_ms,
                    timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                },
            },
        },
        CallOutcome::Failure {
            kind,
            http_status,
            message,
            total_elapsed_ms,
            ..
        } => BoundaryResponse {
            status: *http_status,
            body: ResponseBody::Failure {
                error: user_message(*kind, message),
                code: *kind,
                processing_time: *total_elapsed_ms,
            },
        },
    }
}

fn user_message(kind: ErrorKind, message: &str) -> String {
    match kind {
        ErrorKind::Timeout => format!(
            "{message}. The image processing is taking longer than expected."
        ),
        ErrorKind::ServiceUnavailable => {
            "The image service is temporarily overloaded. Please try again in a few minutes."
                .to_string()
        }
        ErrorKind::Auth => {
            "Invalid API key. Please check your GEMINI_API_KEY configuration.".to_string()
        }
        ErrorKind::RateLimit => {
            "Rate limit exceeded. Please wait before making another request.".to_string()
        }
        ErrorKind::Processing => format!("Failed to replace background: {message}"),
        ErrorKind::Validation => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_success_body() {
        let outcome = CallOutcome::Success {
            image: vec![0, 16, 131],
            total_elapsed_ms: 5123,
            attempts: 2,
        };
        let response = map_outcome_at(&outcome, fixed_time());
        assert_eq!(response.status, 200);
        assert!(response.is_success());

        let json = serde_json::to_value(&response.body).unwrap();
        assert_eq!(json["image"], "ABCD");
        assert_eq!(json["metadata"]["processingTime"], 5123);
        assert_eq!(json["metadata"]["timestamp"], "2024-05-17T09:30:00.000Z");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_body_per_code() {
        let cases = [
            (ErrorKind::Timeout, 408, "Request timed out after 60000ms"),
            (ErrorKind::ServiceUnavailable, 503, "temporarily overloaded"),
            (ErrorKind::Auth, 401, "Invalid API key"),
            (ErrorKind::RateLimit, 429, "Rate limit exceeded"),
            (ErrorKind::Processing, 500, "Failed to replace background"),
            (ErrorKind::Validation, 400, "Missing required fields"),
        ];
        for (kind, status, fragment) in cases {
            let message = match kind {
                ErrorKind::Timeout => "Request timed out after 60000ms",
                ErrorKind::Validation => {
                    "Missing required fields: carImageB64 and prompt are required"
                }
                _ => "upstream said no",
            };
            let outcome = CallOutcome::failure(kind, message, 77, 1);
            let response = map_outcome_at(&outcome, fixed_time());
            assert_eq!(response.status, status);

            let json = serde_json::to_value(&response.body).unwrap();
            assert_eq!(json["code"], kind.code());
            assert_eq!(json["processingTime"], 77);
            let error = json["error"].as_str().unwrap();
            assert!(error.contains(fragment), "{kind}: {error}");
        }
    }

    #[test]
    fn test_processing_error_includes_upstream_message() {
        let outcome = CallOutcome::failure(ErrorKind::Processing, "Gemini HTTP 400: bad", 1, 1);
        match map_outcome_at(&outcome, fixed_time()).body {
            ResponseBody::Failure { error, .. } => {
                assert_eq!(error, "Failed to replace background: Gemini HTTP 400: bad");
            }
            other => panic!("expected failure body, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_body_round_trips_through_json() {
        let json = r#"{"error":"slow down","code":"RATE_LIMIT_ERROR","processingTime":12}"#;
        let body: ResponseBody = serde_json::from_str(json).unwrap();
        assert_eq!(
            body,
            ResponseBody::Failure {
                error: "slow down".to_string(),
                code: ErrorKind::RateLimit,
                processing_time: 12,
            }
        );
    }
}
