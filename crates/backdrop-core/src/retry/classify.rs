//! Classification of upstream failures.
//!
//! Decides whether a failed attempt is worth retrying and which stable error
//! code it surfaces as. Matching on messages is fragile, so the retry rules
//! are a configurable predicate set and the whole classifier is a trait that
//! alternate providers can replace.

use crate::config::RetryConfig;
use crate::error::UpstreamError;
use crate::outcome::ErrorKind;

/// Verdict for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
    pub kind: ErrorKind,
}

impl Classification {
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

/// Decides retryability and error kind for upstream failures.
///
/// Implementations must be pure: the same failure always classifies the same
/// way, and classifiers are shared across concurrent invocations.
pub trait ErrorClassifier: Send + Sync {
    /// Whether another attempt could plausibly succeed.
    fn is_retryable(&self, error: &UpstreamError) -> bool;

    /// Error kind reported to the caller.
    fn kind(&self, error: &UpstreamError) -> ErrorKind {
        default_kind(error)
    }

    fn classify(&self, error: &UpstreamError) -> Classification {
        Classification {
            retryable: self.is_retryable(error),
            kind: self.kind(error),
        }
    }
}

/// Map a failure to its reported kind.
///
/// Timeouts win over statuses, then 503, 401 and 429 get their own codes;
/// everything else is a processing error.
pub fn default_kind(error: &UpstreamError) -> ErrorKind {
    if matches!(error, UpstreamError::Timeout { .. }) || error.to_string().contains("timed out")
    {
        return ErrorKind::Timeout;
    }
    match error.status_code() {
        Some(503) => ErrorKind::ServiceUnavailable,
        Some(401) => ErrorKind::Auth,
        Some(429) => ErrorKind::RateLimit,
        _ => ErrorKind::Processing,
    }
}

/// One retry rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPredicate {
    /// The provider answered with this HTTP status
    Status(u16),
    /// The message contains this fragment (case-insensitive)
    MessageContains(String),
    /// The per-attempt deadline fired
    Timeout,
    /// A successful response carried no image
    EmptyOutput,
}

impl RetryPredicate {
    pub fn matches(&self, error: &UpstreamError) -> bool {
        match self {
            Self::Status(status) => error.status_code() == Some(*status),
            Self::MessageContains(fragment) => error
                .to_string()
                .to_lowercase()
                .contains(&fragment.to_lowercase()),
            Self::Timeout => matches!(error, UpstreamError::Timeout { .. }),
            Self::EmptyOutput => matches!(error, UpstreamError::EmptyOutput(_)),
        }
    }
}

/// Classifier that retries when any predicate matches.
#[derive(Debug, Clone)]
pub struct PredicateClassifier {
    predicates: Vec<RetryPredicate>,
}

impl PredicateClassifier {
    pub fn new(predicates: Vec<RetryPredicate>) -> Self {
        Self { predicates }
    }

    /// Build the rule set from the `[retry]` config section.
    ///
    /// Deadline and empty-output failures are always retryable.
    pub fn from_config(config: &RetryConfig) -> Self {
        let mut predicates: Vec<RetryPredicate> = config
            .retryable_statuses
            .iter()
            .map(|s| RetryPredicate::Status(*s))
            .collect();
        predicates.extend(
            config
                .retryable_patterns
                .iter()
                .map(|p| RetryPredicate::MessageContains(p.clone())),
        );
        predicates.push(RetryPredicate::Timeout);
        predicates.push(RetryPredicate::EmptyOutput);
        Self { predicates }
    }

    pub fn predicates(&self) -> &[RetryPredicate] {
        &self.predicates
    }
}

impl Default for PredicateClassifier {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl ErrorClassifier for PredicateClassifier {
    fn is_retryable(&self, error: &UpstreamError) -> bool {
        self.predicates.iter().any(|p| p.matches(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> UpstreamError {
        UpstreamError::Http {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        let classifier = PredicateClassifier::default();
        for status in [429, 502, 503, 504] {
            assert!(
                classifier.is_retryable(&http(status, "upstream trouble")),
                "{status} should be retryable"
            );
        }
    }

    #[test]
    fn test_auth_error_is_fatal() {
        let classifier = PredicateClassifier::default();
        let verdict = classifier.classify(&http(401, "Gemini HTTP 401: unauthorized"));
        assert!(!verdict.retryable);
        assert_eq!(verdict.kind, ErrorKind::Auth);
        assert_eq!(verdict.http_status(), 401);
    }

    #[test]
    fn test_other_statuses_are_fatal() {
        let classifier = PredicateClassifier::default();
        for status in [400, 403, 404, 500] {
            let verdict = classifier.classify(&http(status, "bad"));
            assert!(!verdict.retryable, "{status} should be fatal");
            assert_eq!(verdict.kind, ErrorKind::Processing);
        }
    }

    #[test]
    fn test_message_patterns_case_insensitive() {
        let classifier = PredicateClassifier::default();
        assert!(classifier.is_retryable(&UpstreamError::Transport(
            "Gemini NETWORK error: reset".to_string()
        )));
        assert!(classifier.is_retryable(&UpstreamError::Transport(
            "Connection refused".to_string()
        )));
        assert!(classifier.is_retryable(&UpstreamError::Transport(
            "socket Timeout".to_string()
        )));
        assert!(!classifier.is_retryable(&UpstreamError::Transport(
            "invalid certificate".to_string()
        )));
    }

    #[test]
    fn test_pattern_in_http_body_counts() {
        // Status 500 alone is fatal, but the message rule still applies.
        let classifier = PredicateClassifier::default();
        assert!(classifier.is_retryable(&http(500, "Gemini HTTP 500: upstream connection lost")));
    }

    #[test]
    fn test_deadline_is_retryable_timeout() {
        let classifier = PredicateClassifier::default();
        let verdict = classifier.classify(&UpstreamError::Timeout { timeout_ms: 60000 });
        assert!(verdict.retryable);
        assert_eq!(verdict.kind, ErrorKind::Timeout);
        assert_eq!(verdict.http_status(), 408);
    }

    #[test]
    fn test_empty_output_is_retryable_processing() {
        let classifier = PredicateClassifier::default();
        let verdict = classifier.classify(&UpstreamError::EmptyOutput("no candidates".into()));
        assert!(verdict.retryable);
        assert_eq!(verdict.kind, ErrorKind::Processing);
    }

    #[test]
    fn test_malformed_response_is_fatal() {
        let classifier = PredicateClassifier::default();
        assert!(!classifier.is_retryable(&UpstreamError::Malformed("bad json".into())));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(default_kind(&http(503, "overloaded")), ErrorKind::ServiceUnavailable);
        assert_eq!(default_kind(&http(429, "slow down")), ErrorKind::RateLimit);
        assert_eq!(default_kind(&http(502, "bad gateway")), ErrorKind::Processing);
        assert_eq!(
            default_kind(&UpstreamError::Transport("operation timed out".into())),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_custom_predicate_set() {
        let classifier = PredicateClassifier::new(vec![RetryPredicate::Status(500)]);
        assert!(classifier.is_retryable(&http(500, "boom")));
        assert!(!classifier.is_retryable(&http(503, "overloaded")));
        assert!(!classifier.is_retryable(&UpstreamError::Timeout { timeout_ms: 1 }));
    }

    #[test]
    fn test_from_config_uses_configured_lists() {
        let config = RetryConfig {
            retryable_statuses: vec![500],
            retryable_patterns: vec!["overloaded".to_string()],
            ..RetryConfig::default()
        };
        let classifier = PredicateClassifier::from_config(&config);
        assert!(classifier.is_retryable(&http(500, "boom")));
        assert!(classifier.is_retryable(&http(400, "model is Overloaded")));
        assert!(!classifier.is_retryable(&http(429, "slow down")));
        assert!(classifier
            .predicates()
            .contains(&RetryPredicate::EmptyOutput));
    }
}
