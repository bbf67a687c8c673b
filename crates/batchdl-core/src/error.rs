//! Error types shared across the engine.

use std::path::PathBuf;

/// Errors raised while constructing or driving the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine spawns detached workers and must be created inside a Tokio runtime.
    #[error("engine must be created from within a Tokio runtime")]
    NoRuntime,
}

/// Failure of a single transfer run. Everything except `Cancelled` ends the
/// run in the `error` state; `Cancelled` ends it in `stopped`.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,
    /// Non-success HTTP status other than 416.
    #[error("server returned HTTP {0}")]
    Http(u32),
    /// Curl reported a transport failure (DNS, connect, timeout, TLS, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transfer task failed: {0}")]
    Join(String),
}

impl TransferError {
    pub(crate) fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        TransferError::Storage {
            context: context.into(),
            source,
        }
    }
}

/// Rejection from destination validation.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("resolved path is outside of the allowed root directory: {}", .0.display())]
    OutsideRoot(PathBuf),
    #[error("destination directory does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot resolve destination {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
