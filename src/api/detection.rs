//! Voice detection endpoint
//!
//! POST /api/voice-detection: validates the API key and request shape, then
//! hands the payload to the pipeline on a blocking worker (decoding and
//! feature extraction are CPU-bound).

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{ApiError, ApiResult};
use crate::models::{Language, VoiceDetectionRequest, VoiceDetectionResponse};
use crate::AppState;

/// Header carrying the caller's API key
const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without a configured API key
fn require_api_key(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden("Missing API key".to_string()))?;

    if !state.api_keys.contains(key) {
        return Err(ApiError::Forbidden("Invalid API key".to_string()));
    }
    Ok(())
}

/// POST /api/voice-detection
///
/// Classifies a short spoken clip as HUMAN or AI_GENERATED, auto-detecting
/// the language when none is supplied. Degraded pipeline outcomes are still
/// HTTP 200 with `status: "success"`; only client-attributable conditions
/// become 4xx.
pub async fn detect_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VoiceDetectionRequest>,
) -> ApiResult<(StatusCode, Json<VoiceDetectionResponse>)> {
    require_api_key(&state, &headers)?;

    if request.audio_format != "mp3" {
        return Err(ApiError::BadRequest(format!(
            "Unsupported audioFormat: {:?} (expected \"mp3\")",
            request.audio_format
        )));
    }

    let audio = BASE64
        .decode(request.audio_base64.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 audio payload: {}", e)))?;

    let pipeline = state.pipeline.clone();
    let language = request.language;

    // Pipeline work is CPU-bound; keep it off the async workers
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&audio, language))
        .await
        .map_err(|e| ApiError::Internal(format!("Detection task failed: {}", e)))??;

    let output = outcome.output();
    Ok((
        StatusCode::OK,
        Json(VoiceDetectionResponse {
            status: "success".to_string(),
            language: Language::join(&output.languages),
            classification: output.classification,
            confidence_score: output.confidence,
            explanation: output.explanation.clone(),
        }),
    ))
}

/// Build detection routes
pub fn detection_routes() -> Router<AppState> {
    Router::new().route("/api/voice-detection", post(detect_voice))
}
