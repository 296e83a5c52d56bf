//! API error type and its HTTP mapping.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{jobs::JobError, spotify::SpotifyError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("upstream answered {status}")]
    Upstream { status: StatusCode, detail: Value },
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Value::String(msg)),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, Value::String(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Value::String(msg)),
            ApiError::Upstream { status, detail } => {
                tracing::warn!("upstream error {}: {}", status, detail);
                (status, detail)
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, Value::String(msg))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(format!("Job {} progress not found", id)),
            // fresh ids make this an internal invariant violation
            JobError::Duplicate(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SpotifyError> for ApiError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::Upstream { status, detail } => ApiError::Upstream { status, detail },
            SpotifyError::Http(e) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                detail: Value::String(format!("Spotify request failed: {}", e)),
            },
            SpotifyError::NotConfigured(_) | SpotifyError::InvalidUrl(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
