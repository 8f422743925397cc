//! Error types for database operations

use fixme_core::SyncError;
use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Stored or supplied value is not valid
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for SyncError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) | Error::AlreadyExists(what) => SyncError::StorageConflict(what),
            other => SyncError::Storage(other.to_string()),
        }
    }
}

/// Map unique-key violations to [`Error::AlreadyExists`]
pub(crate) fn unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> Error {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::AlreadyExists(what()),
        other => Error::Sqlx(other),
    }
}
