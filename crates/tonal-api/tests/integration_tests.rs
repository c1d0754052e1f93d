//! Integration tests for the Tonal proxy API.
//!
//! Every endpoint is exercised through the full router with a mock upstream,
//! covering happy paths, validation failures and upstream failures.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tonal_api::create_router;
use tonal_api::error::ErrorBody;
use tonal_api::handlers::HealthResponse;
use tonal_api::state::AppState;
use tonal_api::upstream::{MockUpstream, UpstreamError};
use tonal_core::personality::Preset;
use tonal_core::types::{AiResponse, TranscriptionResponse};

// =============================================================================
// Helpers
// =============================================================================

const STRUCTURED_REPLY: &str = r#"{
    "text_short": "Hi!",
    "text_long": "Hi! Nice to meet you.",
    "speech_text": "Hi there!",
    "tone_summary": {"humor": 40, "sarcasm": 0, "seriousness": 30, "empathy": 90},
    "action": ["Say hello back"]
}"#;

const BOUNDARY: &str = "tonal-test-boundary";

fn make_app(upstream: Arc<MockUpstream>) -> axum::Router {
    create_router(AppState::new(upstream))
}

fn default_app() -> axum::Router {
    make_app(Arc::new(MockUpstream::replying(STRUCTURED_REPLY)))
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Build a multipart body with one file field.
fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/api/transcribe")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn error_body(resp: axum::response::Response) -> ErrorBody {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let resp = default_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_404_json() {
    let resp = default_app()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_body(resp).await.error, "not_found");
}

// =============================================================================
// POST /api/chat
// =============================================================================

#[tokio::test]
async fn test_chat_returns_structured_reply() {
    let upstream = Arc::new(MockUpstream::replying(STRUCTURED_REPLY));
    let body = serde_json::json!({
        "message": "Hello",
        "personality": Preset::Funny.config(),
    });
    let resp = make_app(upstream.clone())
        .oneshot(post_json("/api/chat", &body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: AiResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(reply.text_short, "Hi!");
    assert_eq!(reply.speech_text, "Hi there!");
    assert_eq!(reply.action, vec!["Say hello back"]);

    let system = upstream.last_system_prompt().unwrap();
    assert!(system.contains("humor: 85"));
    assert!(system.contains("sarcasm: 10"));
}

#[tokio::test]
async fn test_chat_plain_text_reply_degrades() {
    let upstream = Arc::new(MockUpstream::replying("Just words."));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/chat", r#"{"message": "Hello"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: AiResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(reply.text_short, "Just words.");
    assert_eq!(reply.speech_text, "Just words.");
    assert_eq!(reply.tone_summary, Preset::Supportive.config());
}

#[tokio::test]
async fn test_chat_missing_message_is_400() {
    for body in [r#"{}"#, r#"{"message": ""}"#, r#"{"message": "   "}"#] {
        let resp = default_app()
            .oneshot(post_json("/api/chat", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(error_body(resp).await.error, "bad_request");
    }
}

#[tokio::test]
async fn test_chat_out_of_range_trait_is_400() {
    let body = r#"{"message": "hi", "personality": {"humor": 101, "sarcasm": 0, "seriousness": 0, "empathy": 0}}"#;
    let resp = default_app()
        .oneshot(post_json("/api/chat", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err = error_body(resp).await;
    assert!(err.message.contains("humor"));
}

#[tokio::test]
async fn test_chat_invalid_json_is_400() {
    let resp = default_app()
        .oneshot(post_json("/api/chat", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_upstream_failure_is_502_with_details() {
    let upstream = Arc::new(MockUpstream::failing(UpstreamError::Status {
        status: 401,
        body: "invalid api key".to_string(),
    }));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/chat", r#"{"message": "Hello"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let err = error_body(resp).await;
    assert_eq!(err.error, "bad_gateway");
    assert_eq!(err.details, Some(Value::String("invalid api key".to_string())));
}

#[tokio::test]
async fn test_chat_missing_api_key_is_500() {
    let upstream = Arc::new(MockUpstream::failing(UpstreamError::MissingApiKey(
        "OPENAI_API_KEY".to_string(),
    )));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/chat", r#"{"message": "Hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_chat_empty_upstream_reply_is_502() {
    let upstream = Arc::new(MockUpstream::replying("  "));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/chat", r#"{"message": "Hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// POST /api/transcribe
// =============================================================================

#[tokio::test]
async fn test_transcribe_returns_text() {
    let upstream = Arc::new(MockUpstream::replying("").with_transcript("hello world"));
    let resp = make_app(upstream.clone())
        .oneshot(multipart_request("audio", "recording.webm", b"\x1a\x45\xdf\xa3"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: TranscriptionResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.text, "hello world");

    let forwarded = upstream.last_audio().unwrap();
    assert_eq!(forwarded.file_name, "recording.webm");
    assert_eq!(forwarded.mime_type, "audio/webm");
    assert_eq!(forwarded.bytes, b"\x1a\x45\xdf\xa3".to_vec());
}

#[tokio::test]
async fn test_transcribe_without_audio_field_is_400() {
    let resp = default_app()
        .oneshot(multipart_request("other", "x.webm", b"abc"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_empty_audio_is_400() {
    let resp = default_app()
        .oneshot(multipart_request("audio", "recording.webm", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_not_multipart_is_400() {
    let resp = default_app()
        .oneshot(post_json("/api/transcribe", r#"{"audio": "nope"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_oversized_audio_is_400() {
    let upstream = Arc::new(MockUpstream::replying(""));
    let app = create_router(AppState::new(upstream).with_max_audio_bytes(4));
    let resp = app
        .oneshot(multipart_request("audio", "recording.webm", b"0123456789"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_upstream_failure_is_502() {
    let upstream = Arc::new(MockUpstream::failing(UpstreamError::Transport(
        "connection reset".to_string(),
    )));
    let resp = make_app(upstream)
        .oneshot(multipart_request("audio", "recording.webm", b"abc"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// POST /api/tts
// =============================================================================

#[tokio::test]
async fn test_tts_returns_mpeg() {
    let upstream = Arc::new(MockUpstream::replying("").with_audio(b"ID3audio".to_vec()));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/tts", r#"{"text": "Hi there!"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(body_bytes(resp).await, b"ID3audio".to_vec());
}

#[tokio::test]
async fn test_tts_missing_text_is_400() {
    for body in [r#"{}"#, r#"{"text": ""}"#] {
        let resp = default_app()
            .oneshot(post_json("/api/tts", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

#[tokio::test]
async fn test_tts_upstream_failure_is_502() {
    let upstream = Arc::new(MockUpstream::failing(UpstreamError::Timeout));
    let resp = make_app(upstream)
        .oneshot(post_json("/api/tts", r#"{"text": "Hi"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}
