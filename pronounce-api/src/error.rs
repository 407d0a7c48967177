//! Error types for pronounce-api
//!
//! Every failure surfaced to clients is an [`ApiError`]; the HTTP status and
//! error code are chosen here and nowhere else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AssessError, MergeError, RecognitionFailure};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Speech service returned no usable result (400)
    #[error("Recognition failed: {0}")]
    Recognition(RecognitionFailure),

    /// Service misconfiguration, e.g. missing credentials (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uploaded audio could not be staged or read back (500)
    #[error("Audio staging failed: {0}")]
    AudioStaging(#[from] std::io::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<AssessError> for ApiError {
    fn from(err: AssessError) -> Self {
        match err {
            AssessError::NotConfigured => ApiError::Config(err.to_string()),
            AssessError::Audio(e) => ApiError::AudioStaging(e),
            AssessError::Recognition(failure) => ApiError::Recognition(failure),
        }
    }
}

impl From<MergeError> for ApiError {
    fn from(err: MergeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Recognition(ref failure) => (
                StatusCode::BAD_REQUEST,
                "RECOGNITION_FAILED",
                failure.to_string(),
                serde_json::to_value(failure).ok(),
            ),
            ApiError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg,
                None,
            ),
            ApiError::AudioStaging(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUDIO_STAGING_FAILED",
                err.to_string(),
                None,
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
                None,
            ),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
