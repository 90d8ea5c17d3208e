//! Index error types.

use thiserror::Error;

/// Index operation errors.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("module not indexed: {0}")]
    NotIndexed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IndexError {
    pub fn is_not_indexed(&self) -> bool {
        matches!(self, IndexError::NotIndexed(_))
    }
}

/// Result type for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
