//! Storage error types.

use thiserror::Error;

/// Errors surfaced by the event store and its repositories.
///
/// "Not found" is never an error: lookups return `None` or an empty `Vec`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is unreachable or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The backing store rejected a write because of a constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored row could not be mapped back into an event.
    #[error("decode error: {0}")]
    Decode(String),

    /// The background task running an asynchronous save did not complete.
    #[error("task aborted: {0}")]
    TaskAborted(String),
}

/// Result alias used across the event log crates.
pub type StoreResult<T> = Result<T, StoreError>;
