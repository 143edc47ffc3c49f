//! Common error types for Seedling

use thiserror::Error;

/// Common result type for Seedling operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Seedling services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite busy/locked contention that is worth retrying
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database is busy")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_contention() {
        assert!(!Error::Config("bad".to_string()).is_lock_contention());
        assert!(!Error::Internal("database is locked".to_string()).is_lock_contention());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::NotFound("seed abc".to_string());
        assert_eq!(err.to_string(), "Not found: seed abc");
    }
}
