//! Error types for the storage layer.

use refcheck_types::SessionId;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from DuckDB.
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The target collection does not exist.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// The session was never opened, or already committed/aborted.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// The filter cannot be evaluated.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A record is not storable (not an object, or no usable `_id`).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A blocking database call panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// The backend cannot be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
