//! Unified error types for shellcache.
//!
//! Lifecycle failures (precache, activation) and runtime fetch failures are
//! kept distinct so the host can decide what to retry.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::WorkerState;

/// Unified error types for the shellcache worker and host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// URL scheme that cannot be cached (anything but http/https).
    #[error("UNSUPPORTED_SCHEME: {0}")]
    UnsupportedScheme(String),

    /// Version string or changelog could not be parsed.
    #[error("INVALID_VERSION: {0}")]
    InvalidVersion(String),

    /// One or more install-time asset fetches failed.
    #[error("PRECACHE_FAILED: {0}")]
    Precache(String),

    /// Enumerating or deleting stale generations failed.
    #[error("ACTIVATION_FAILED: {0}")]
    Activation(String),

    /// Lifecycle operation attempted from the wrong state.
    #[error("INVALID_STATE: expected {expected}, worker is {actual}")]
    InvalidState { expected: WorkerState, actual: WorkerState },

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Network failure or non-success HTTP response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::UnsupportedScheme(msg) => (-32003, msg.clone()),
            Error::InvalidVersion(msg) => (-32602, msg.clone()),
            Error::Precache(msg) => (-32020, msg.clone()),
            Error::Activation(msg) => (-32021, msg.clone()),
            Error::InvalidState { .. } => (-32022, err.to_string()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
