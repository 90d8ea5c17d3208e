//! Upstream error types.

use thiserror::Error;

/// Errors raised while resolving or fetching modules.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no path template configured for domain {0}")]
    NoPathTemplate(String),

    #[error("go-get discovery failed for {domain}: {reason}")]
    Discovery { domain: String, reason: String },

    #[error("fetch request for {0} has no path")]
    EmptyPath(String),

    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Core(#[from] modprox_core::Error),
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;
