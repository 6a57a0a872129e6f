//! Error types for voxcheck
//!
//! HTTP-facing error taxonomy: client-attributable conditions surface as 4xx
//! with a structured JSON body; everything unexpected is a 500. Internal
//! pipeline failures never reach this layer (they are absorbed into degraded
//! results by the orchestrator).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::PipelineError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid API key (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            // Both pipeline errors are caller-attributable
            PipelineError::Decode(e) => ApiError::BadRequest(format!("Failed to decode audio: {}", e)),
            PipelineError::UndeterminableLanguage => {
                ApiError::BadRequest("Audio is not detectable".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Other(ref err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DecodeError;

    #[test]
    fn test_pipeline_errors_map_to_bad_request() {
        let err: ApiError = PipelineError::UndeterminableLanguage.into();
        assert!(matches!(err, ApiError::BadRequest(ref msg) if msg == "Audio is not detectable"));

        let err: ApiError = PipelineError::Decode(DecodeError::Empty).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
