//! Error responses for the proxy HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use modprox_index::IndexError;
use modprox_storage::StorageError;
use serde::Serialize;

/// JSON body of every failed proxy request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] modprox_core::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
            Self::Index(IndexError::NotIndexed(_)) => "not_indexed",
            Self::Index(_) => "index_error",
            Self::Storage(_) => "storage_error",
            Self::Core(_) => "core_error",
        }
    }

    /// Missing modules and blobs are 404s, unparsable request paths are
    /// 400s, and the rest is on us.
    pub fn status_code(&self) -> StatusCode {
        let client_fault = match self {
            Self::NotFound(_) => return StatusCode::NOT_FOUND,
            Self::Index(e) if e.is_not_indexed() => return StatusCode::NOT_FOUND,
            Self::Storage(e) if e.is_not_found() => return StatusCode::NOT_FOUND,
            Self::BadRequest(_) => true,
            Self::Core(
                modprox_core::Error::InvalidCoordinate(_) | modprox_core::Error::InvalidEscape(_),
            ) => true,
            _ => false,
        };
        if client_fault {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "proxy request failed");
        }
        let message = self.to_string();
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
