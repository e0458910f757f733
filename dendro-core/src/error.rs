//! Core error types

use thiserror::Error;

/// Errors raised by the pure scheduling logic
///
/// These carry no I/O failures; the orchestrator wraps them together with
/// store and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed or incomplete input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The job is not in a state that permits the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A redaction or consistency check failed after the fact
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The job definition could not be serialized canonically
    #[error("Failed to canonicalize job definition: {0}")]
    Canonicalization(String),
}
