//! Error types for evalio-ae HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::EvaluationError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller identity missing (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session owned by another user (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload larger than the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Provider failure or timeout (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// evalio-common error
    #[error("Common error: {0}")]
    Common(#[from] evalio_common::Error),
}

impl From<EvaluationError> for ApiError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::InvalidAudioMetadata(_)
            | EvaluationError::UnsupportedAudio(_)
            | EvaluationError::LowAudioQuality { .. }
            | EvaluationError::UnknownQuestion(_) => ApiError::BadRequest(err.to_string()),
            EvaluationError::Forbidden => ApiError::Forbidden(err.to_string()),
            EvaluationError::SessionNotFound(_) => {
                ApiError::NotFound("Interview session not found".to_string())
            }
            EvaluationError::TranscriptionFailed(_)
            | EvaluationError::EvaluationFailed(_)
            | EvaluationError::EvaluationParseError(_)
            | EvaluationError::SynthesisFailed(_)
            | EvaluationError::ProviderTimeout { .. } => ApiError::BadGateway(err.to_string()),
            EvaluationError::Storage(e) => ApiError::Common(e),
            EvaluationError::Io(e) => ApiError::Io(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
