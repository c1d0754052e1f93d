//! Route handler functions for all API endpoints.
//!
//! Each handler validates its input, forwards to the upstream provider
//! through `AppState`, and returns JSON (or audio) responses.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use tonal_core::personality::PersonalityConfig;
use tonal_core::types::{AiResponse, AudioClip, TranscriptionResponse};

use crate::error::ApiError;
use crate::prompt;
use crate::state::AppState;
use crate::upstream::UpstreamAudio;

/// Multipart field carrying the recording.
pub const AUDIO_FIELD: &str = "audio";
/// File name used when the upload does not carry one.
pub const DEFAULT_AUDIO_FILE_NAME: &str = "recording.webm";

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /api/chat.
///
/// Fields are optional here so that a missing field is reported as a
/// validation error rather than a decode error.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub personality: Option<PersonalityConfig>,
}

/// Request body for POST /api/tts.
#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/chat - personality-conditioned chat completion.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<AiResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let message = non_blank(body.message)
        .ok_or_else(|| ApiError::BadRequest("'message' is required".to_string()))?;
    let personality = body.personality.unwrap_or_default();
    personality
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    debug!(%personality, chars = message.len(), "Chat request");
    let system = prompt::system_prompt(&personality);
    let raw = state
        .upstream
        .chat_completion(&system, &message)
        .await
        .inspect_err(|e| error!("Chat completion failed: {}", e))?;

    if raw.trim().is_empty() {
        return Err(ApiError::BadGateway {
            message: "upstream returned an empty reply".to_string(),
            details: String::new(),
        });
    }

    Ok(Json(prompt::parse_reply(&raw, &personality)))
}

/// POST /api/transcribe - speech to text from a multipart `audio` field.
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .unwrap_or(DEFAULT_AUDIO_FILE_NAME)
            .to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(AudioClip::RECORDING_MIME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        audio = Some(UpstreamAudio {
            bytes: bytes.to_vec(),
            file_name,
            mime_type,
        });
        break;
    }

    let audio = audio
        .filter(|a| !a.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("no audio file provided".to_string()))?;
    if audio.bytes.len() > state.max_audio_bytes {
        return Err(ApiError::BadRequest(format!(
            "audio exceeds {} bytes",
            state.max_audio_bytes
        )));
    }

    debug!(bytes = audio.bytes.len(), file = %audio.file_name, "Transcription request");
    let text = state
        .upstream
        .transcribe(audio)
        .await
        .inspect_err(|e| error!("Transcription failed: {}", e))?;

    Ok(Json(TranscriptionResponse { text }))
}

/// POST /api/tts - text to MP3 speech.
pub async fn tts(
    State(state): State<AppState>,
    body: Result<Json<SpeechBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text =
        non_blank(body.text).ok_or_else(|| ApiError::BadRequest("no text provided".to_string()))?;

    debug!(chars = text.len(), "Speech request");
    let audio = state
        .upstream
        .speech(&text)
        .await
        .inspect_err(|e| error!("Speech synthesis failed: {}", e))?;

    Ok(([(header::CONTENT_TYPE, AudioClip::SPEECH_MIME)], audio))
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    info!("Request for unknown route");
    ApiError::NotFound("no such endpoint".to_string())
}
