//! Storage error types

use sea_orm::DbErr;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection-related errors
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution errors
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration errors
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Entity not found
    #[error("Entity not found")]
    NotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DbErr> for StorageError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(e) => StorageError::ConnectionFailed(e.to_string()),
            DbErr::ConnectionAcquire(e) => StorageError::ConnectionFailed(e.to_string()),
            DbErr::Migration(msg) => StorageError::MigrationFailed(msg),
            DbErr::RecordNotFound(_) => StorageError::NotFound,
            other => StorageError::QueryFailed(other.to_string()),
        }
    }
}
