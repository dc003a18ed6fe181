//! Error types for waypost-store.

use std::path::PathBuf;

use waypost_core::StoreError;

/// Result type for waypost-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in waypost-store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored timestamp is outside the representable range.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        StoreError::Write(err.to_string())
    }
}
