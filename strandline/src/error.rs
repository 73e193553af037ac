use thiserror::Error;

/// The error type for the server process: fatal configuration/startup failures.
/// Mirrors `strandline_store::StoreError` split between "something the retry
/// driver can treat as a conflict" and "everything else propagates unchanged",
/// but at the transport boundary every variant here is fatal -- logged, and the
/// process exits.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("storage error: {0}")]
    Store(#[from] strandline_store::StoreError),
}

/// A per-connection error, turned into a `ServerMessage::Error` sent to the
/// originating connection rather than propagated as a fatal `ServerError`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Signal(#[from] strandline_core::Signal),
    #[error("storage error: {0}")]
    Store(#[from] strandline_store::StoreError),
    #[error("malformed client message: {0}")]
    Malformed(#[from] json::Error),
}

impl From<strandline_core::EngineError<strandline_store::StoreError>> for SessionError {
    fn from(err: strandline_core::EngineError<strandline_store::StoreError>) -> Self {
        match err {
            strandline_core::EngineError::Signal(signal) => SessionError::Signal(signal),
            strandline_core::EngineError::Storage(err) => SessionError::Store(err),
        }
    }
}
