use std::fmt;

use thiserror::Error;

/// The two internal control-flow signals the mutation engine can raise.
///
/// This is the Rust-idiomatic rendering of the "raise differently named errors"
/// scheme: a plain enum the retry driver matches on, rather than a raised/caught
/// exception an errant `?` could accidentally swallow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A lost race on a version- or pointer-check predicate, or a storage-level
    /// serialization abort. Only ever caught by the retry driver; re-running with
    /// fresh reads is sound and terminates with high probability.
    Retry,
    /// A requested anchor (reference node, delete target, required neighbour) is
    /// permanently absent in the current state, or the retry budget was exhausted.
    /// Surfaced to the caller unchanged.
    Conflict(String),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Retry => write!(f, "retryable conflict"),
            Signal::Conflict(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Signal {}

/// Everything a mutation closure or the storage adapter can fail with.
///
/// `Signal` variants are handled exclusively by [`crate::retry::with_retry`];
/// [`EngineError::Storage`] propagates unchanged to the caller, since it represents
/// something no retry can fix (storage unavailability, a malformed query, etc.).
#[derive(Debug, Error)]
pub enum EngineError<S> {
    #[error("{0}")]
    Signal(Signal),
    #[error(transparent)]
    Storage(S),
}

impl<S> From<Signal> for EngineError<S> {
    fn from(signal: Signal) -> Self {
        EngineError::Signal(signal)
    }
}

impl<S> EngineError<S> {
    pub fn conflict(message: impl Into<String>) -> Self {
        EngineError::Signal(Signal::Conflict(message.into()))
    }

    pub fn retry() -> Self {
        EngineError::Signal(Signal::Retry)
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, EngineError::Signal(Signal::Retry))
    }
}
