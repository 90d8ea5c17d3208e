//! Errors for the catalog and its HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Failures of the serial catalog and its setup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure body returned by every registry endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("catalog error: {0}")]
    Registry(#[from] RegistryError),

    #[error("core error: {0}")]
    Core(#[from] modprox_core::Error),
}

impl ApiError {
    /// Status and machine-readable code for this failure.
    ///
    /// Only a malformed coordinate is the caller's fault; other core errors
    /// mean the catalog holds something it should not.
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Core(modprox_core::Error::InvalidCoordinate(_)) => {
                (StatusCode::BAD_REQUEST, "core_error")
            }
            Self::Core(_) => (StatusCode::INTERNAL_SERVER_ERROR, "core_error"),
            Self::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "registry request failed");
        }
        let message = self.to_string();
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_coordinate_is_client_error() {
        let err = ApiError::from(modprox_core::Error::InvalidCoordinate("x".into()));
        assert_eq!(err.classify(), (StatusCode::BAD_REQUEST, "core_error"));

        let err = ApiError::from(RegistryError::Config("boom".into()));
        assert_eq!(
            err.classify(),
            (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error")
        );
    }
}
