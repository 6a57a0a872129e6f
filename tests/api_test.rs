//! Router-level tests: auth, request validation, and response schema

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tower::ServiceExt;

use voxcheck::services::{LanguageError, LanguageModel, Pipeline, RawLanguageGuess, TrainedModel};
use voxcheck::utils::TARGET_SAMPLE_RATE;
use voxcheck::{build_router, AppState};

const TEST_API_KEY: &str = "sk_test_123456789";

struct StubLanguageModel(Option<(&'static str, f32)>);

impl LanguageModel for StubLanguageModel {
    fn identify(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> Result<Option<RawLanguageGuess>, LanguageError> {
        Ok(self.0.map(|(code, probability)| RawLanguageGuess {
            code: code.to_string(),
            probability,
        }))
    }
}

fn test_state(language_model: Arc<dyn LanguageModel>) -> AppState {
    let model = Arc::new(
        TrainedModel::from_json(
            &serde_json::json!({
                "classes": ["AI_GENERATED", "HUMAN"],
                "trees": [{"nodes": [{"kind": "leaf", "distribution": [0.25, 0.75]}]}]
            })
            .to_string(),
        )
        .unwrap(),
    );
    let pipeline = Arc::new(Pipeline::new(model, language_model));
    AppState::new(pipeline, HashSet::from([TEST_API_KEY.to_string()]))
}

fn tone_clip_base64() -> String {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..TARGET_SAMPLE_RATE {
            let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / TARGET_SAMPLE_RATE as f32)
                .sin()
                * 0.5;
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    BASE64.encode(cursor.into_inner())
}

fn detection_request(api_key: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/voice-detection")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_api_key_is_forbidden() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            None,
            serde_json::json!({"audioFormat": "mp3", "audioBase64": tone_clip_base64()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_invalid_api_key_is_forbidden() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some("wrong-key"),
            serde_json::json!({"audioFormat": "mp3", "audioBase64": tone_clip_base64()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_audio_format_is_bad_request() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({"audioFormat": "wav", "audioBase64": tone_clip_base64()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({"audioFormat": "mp3", "audioBase64": "!!not-base64!!"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_audio_is_bad_request() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({
                "language": "English",
                "audioFormat": "mp3",
                "audioBase64": BASE64.encode(b"definitely not audio"),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undeterminable_language_is_bad_request() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({"audioFormat": "mp3", "audioBase64": tone_clip_base64()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Audio is not detectable");
}

#[tokio::test]
async fn test_successful_detection_schema() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({
                "language": "Tamil",
                "audioFormat": "mp3",
                "audioBase64": tone_clip_base64(),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["language"], "Tamil");
    assert_eq!(body["classification"], "HUMAN");
    let confidence = body["confidenceScore"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!(body["explanation"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn test_auto_detected_language_in_response() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(Some(("ml", 0.9))))));
    let response = app
        .oneshot(detection_request(
            Some(TEST_API_KEY),
            serde_json::json!({"audioFormat": "mp3", "audioBase64": tone_clip_base64()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["language"], "Malayalam");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = build_router(test_state(Arc::new(StubLanguageModel(None))));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "voxcheck");

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "online");
}
