//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid module coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid serial id range: {0}")]
    InvalidRange(String),

    #[error("invalid escaped path: {0}")]
    InvalidEscape(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("go.mod file has non-canonical casing: {0}")]
    ModFileCasing(String),

    #[error("archive i/o error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
