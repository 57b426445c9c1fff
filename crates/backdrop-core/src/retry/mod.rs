//! Resilience layer for upstream calls.
//!
//! Classification of failures, jittered exponential backoff, per-attempt
//! deadlines, and the invoker that combines them into one bounded run.

pub mod backoff;
pub mod classify;
pub mod deadline;
pub mod invoker;
pub mod policy;

pub use backoff::Backoff;
pub use classify::{Classification, ErrorClassifier, PredicateClassifier, RetryPredicate};
pub use deadline::DeadlineGuard;
pub use invoker::RetryingInvoker;
pub use policy::RetryPolicy;
