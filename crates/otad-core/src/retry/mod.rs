//! Retry with backoff for pure connection failures.
//!
//! HTTP-level errors (non-2xx statuses) are never retried here; those are
//! surfaced to the caller, which decides whether to restart the attempt.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_transport_error};
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
