//! Unified error types for feedgrab.
//!
//! Everything in here is surfaced to the caller. Network failures are not
//! errors at this level; the fetcher reports them as a failed outcome.

use tokio_rusqlite::rusqlite;

/// Unified error types for the feedgrab core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an unusable base path).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Session name cannot be turned into a store file name.
    #[error("INVALID_SESSION: {0}")]
    InvalidSessionName(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Filesystem operation around the store failed.
    #[error("STORE_IO: {0}")]
    StoreIo(#[from] std::io::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Operation attempted on a session that was already closed.
    #[error("SESSION_CLOSED: {0}")]
    SessionClosed(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP_CLIENT: {0}")]
    HttpClient(String),
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
