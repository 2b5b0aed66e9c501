//! Unified error handling for the functions app.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use cloud_retail_core::StorageError;

/// Application-level error type for the functions app.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage service operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong function key.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client. The message is returned as the body.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            Self::Internal(_) | Self::Storage(StorageError::Backend(_) | StorageError::Codec(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Function request error"
            );
        }

        let status = match &self {
            Self::Storage(err) => match err {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Conflict(_) => StatusCode::CONFLICT,
                StorageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StorageError::Codec(_) | StorageError::Backend(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // 404 and 401 have no body
        match self {
            Self::NotFound(_) | Self::Storage(StorageError::NotFound(_)) | Self::Unauthorized => {
                status.into_response()
            }
            Self::Storage(StorageError::Conflict(msg) | StorageError::InvalidInput(msg))
            | Self::BadRequest(msg) => (status, msg).into_response(),
            _ => (status, "Internal server error").into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
