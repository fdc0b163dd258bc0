//! Error types for the breaker core

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for breaker construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when constructing a breaker
#[derive(Error, Debug)]
pub enum Error {
    /// `sleep_window` is shorter than `time_window`, so the error rate
    /// would not be reset after a sleep
    #[error(
        "invalid configuration for circuit '{circuit}': sleep_window ({sleep_window:?}) is \
         shorter than time_window ({time_window:?}), the error rate would not be reset after a sleep"
    )]
    InvalidConfig {
        /// Circuit name the configuration was supplied for
        circuit: String,
        /// Configured cooldown period
        sleep_window: Duration,
        /// Configured counting bucket length
        time_window: Duration,
    },
}

/// Errors surfaced by the storage collaborator
///
/// The breaker does not handle these specially: a call that cannot reach
/// its state store fails with the storage error rather than silently
/// bypassing protection.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific failure (connection refused, protocol error, ...)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// IO error
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),
}

/// Fast-fail marker returned instead of invoking the protected operation
/// while the circuit is open
///
/// Never wraps the underlying operation's error; it only signals that the
/// call was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circuit '{circuit}' is open, call skipped")]
pub struct CircuitOpenError {
    /// Name of the open circuit
    pub circuit: String,
}

/// Result surface of a protected call
#[derive(Error, Debug)]
pub enum RunError<E> {
    /// The circuit was open; the operation was not invoked
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The operation itself failed; the error is propagated unchanged
    #[error("{0}")]
    Inner(E),

    /// The storage collaborator failed; circuit state is unknown
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<E> RunError<E> {
    /// True when the call was skipped because the circuit was open
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// The wrapped operation's error, if this is one
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
