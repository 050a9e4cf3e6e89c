// Error type for the HTTP boundary. Internals use anyhow and are converted here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::blassa_api::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal error: {0:#}")]
    InternalServerError(#[from] anyhow::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    // The backend answered with an error; the message is safe to show
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(e) => {
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Unauthorized(message) => {
                tracing::warn!("Unauthorized access attempt: {}", message);
                (StatusCode::UNAUTHORIZED, message)
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Upstream(message) => {
                tracing::warn!("Backend rejected request: {}", message);
                (StatusCode::BAD_GATEWAY, message)
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

// Backend status errors keep their user-facing message
impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status { status, message } if status == StatusCode::UNAUTHORIZED => {
                AppError::Unauthorized(message)
            }
            ApiError::Status { status, message } if status == StatusCode::NOT_FOUND => {
                AppError::NotFound(message)
            }
            ApiError::Status { message, .. } => AppError::Upstream(message),
            ApiError::Other(e) => AppError::InternalServerError(e),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
