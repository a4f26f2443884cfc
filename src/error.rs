//! Error types for Quiesce
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Errors raised while constructing or configuring a barrier
#[derive(Debug, Error)]
pub enum BarrierError {
    /// No tokio runtime is available to drive animation watchers and gates
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// Configuration values are out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for Quiesce operations
pub type Result<T> = std::result::Result<T, BarrierError>;

/// Outcome of a gate that did not yield the operation's value.
///
/// The operation's own error is carried through untouched so callers see the
/// same payload whether or not the barrier delayed them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError<E> {
    /// The wrapped operation settled as failed
    #[error("Operation failed: {0}")]
    Operation(E),

    /// The gate was cancelled before its operation settled
    #[error("Operation cancelled")]
    Cancelled,
}

impl<E> GateError<E> {
    /// Whether the gate was cancelled rather than failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GateError::Cancelled)
    }

    /// The operation's own error, if it failed
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            GateError::Operation(err) => Some(err),
            GateError::Cancelled => None,
        }
    }
}
