//! Upstream model provider.
//!
//! `OpenAiUpstream` talks to an OpenAI-compatible REST API: chat
//! completions, audio transcriptions and audio speech. `MockUpstream`
//! answers from memory for tests and offline runs.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tonal_core::config::UpstreamConfig;

/// Errors talking to the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode upstream response: {0}")]
    Decode(String),
    #[error("upstream request timed out")]
    Timeout,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Audio handed to the transcription endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamAudio {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// The three provider operations the proxy forwards to.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Raw assistant text for a system prompt and one user message.
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String, UpstreamError>;

    /// Transcript of an audio file.
    async fn transcribe(&self, audio: UpstreamAudio) -> Result<String, UpstreamError>;

    /// MP3 bytes speaking `text`.
    async fn speech(&self, text: &str) -> Result<Vec<u8>, UpstreamError>;
}

// =============================================================================
// OpenAI-compatible provider
// =============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<ChoiceMessage>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionBody {
    text: String,
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

/// Provider client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiUpstream {
    client: Client,
    config: UpstreamConfig,
    api_key: Option<String>,
}

impl OpenAiUpstream {
    /// Build a client from config; the key is read from `config.api_key_env`.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!("{} is not set; upstream requests will fail", config.api_key_env);
        }
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Override the API key after construction.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::MissingApiKey(self.config.api_key_env.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read upstream error body".to_string());
        warn!(status = status.as_u16(), "Upstream returned an error: {}", body);
        Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Upstream for OpenAiUpstream {
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let key = self.api_key()?;
        let body = CompletionRequest {
            model: &self.config.chat_model,
            messages: vec![
                CompletionMessage {
                    role: "system",
                    content: system,
                },
                CompletionMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(model = %self.config.chat_model, "Requesting chat completion");
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let parsed: CompletionResponse = Self::check(response).await?.json().await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.and_then(|m| m.content).or(c.text))
            .unwrap_or_default();
        Ok(text)
    }

    async fn transcribe(&self, audio: UpstreamAudio) -> Result<String, UpstreamError> {
        let key = self.api_key()?;
        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.transcription_model.clone());

        debug!(model = %self.config.transcription_model, "Requesting transcription");
        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;
        let parsed: TranscriptionBody = Self::check(response).await?.json().await?;
        Ok(parsed.text)
    }

    async fn speech(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        let key = self.api_key()?;
        let body = SpeechBody {
            model: &self.config.speech_model,
            voice: &self.config.voice,
            input: text,
        };

        debug!(model = %self.config.speech_model, voice = %self.config.voice, "Requesting speech");
        let response = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

// =============================================================================
// Mock provider
// =============================================================================

/// In-memory provider with canned answers.
///
/// Records the last system prompt and audio upload so tests can inspect
/// what the proxy forwarded.
#[derive(Debug)]
pub struct MockUpstream {
    reply: String,
    transcript: String,
    audio: Vec<u8>,
    failure: Option<UpstreamError>,
    last_system: Mutex<Option<String>>,
    last_audio: Mutex<Option<UpstreamAudio>>,
}

impl MockUpstream {
    /// Answer chat completions with `reply` verbatim.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            transcript: "mock transcript".to_string(),
            audio: b"ID3mock".to_vec(),
            failure: None,
            last_system: Mutex::new(None),
            last_audio: Mutex::new(None),
        }
    }

    /// Fail every operation with `err`.
    pub fn failing(err: UpstreamError) -> Self {
        Self {
            failure: Some(err),
            ..Self::replying("")
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = transcript.into();
        self
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_system.lock().ok().and_then(|s| s.clone())
    }

    pub fn last_audio(&self) -> Option<UpstreamAudio> {
        self.last_audio.lock().ok().and_then(|a| a.clone())
    }

    fn fail_if_configured(&self) -> Result<(), UpstreamError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn chat_completion(&self, system: &str, _user: &str) -> Result<String, UpstreamError> {
        if let Ok(mut last) = self.last_system.lock() {
            *last = Some(system.to_string());
        }
        self.fail_if_configured()?;
        Ok(self.reply.clone())
    }

    async fn transcribe(&self, audio: UpstreamAudio) -> Result<String, UpstreamError> {
        if let Ok(mut last) = self.last_audio.lock() {
            *last = Some(audio);
        }
        self.fail_if_configured()?;
        Ok(self.transcript.clone())
    }

    async fn speech(&self, _text: &str) -> Result<Vec<u8>, UpstreamError> {
        self.fail_if_configured()?;
        Ok(self.audio.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = UpstreamConfig {
            base_url: "https://api.example.com/v1/".to_string(),
            ..UpstreamConfig::default()
        };
        let upstream = OpenAiUpstream::new(config).unwrap();
        assert_eq!(
            upstream.url("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let config = UpstreamConfig {
            api_key_env: "TONAL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            ..UpstreamConfig::default()
        };
        let upstream = OpenAiUpstream::new(config).unwrap();
        let err = upstream.chat_completion("sys", "hi").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::MissingApiKey("TONAL_TEST_KEY_THAT_IS_NEVER_SET".to_string())
        );
    }

    #[test]
    fn test_completion_request_shape() {
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: vec![CompletionMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 800,
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_completion_response_variants() {
        let chat: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hey"}}]}"#).unwrap();
        assert_eq!(
            chat.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("hey")
        );

        let legacy: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"text":"old style"}]}"#).unwrap();
        assert_eq!(legacy.choices[0].text.as_deref(), Some("old style"));

        let empty: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.choices.is_empty());
    }

    #[tokio::test]
    async fn test_mock_records_inputs() {
        let mock = MockUpstream::replying("ok").with_transcript("hello");
        assert_eq!(mock.chat_completion("system!", "u").await.unwrap(), "ok");
        assert_eq!(mock.last_system_prompt().as_deref(), Some("system!"));

        let audio = UpstreamAudio {
            bytes: vec![1, 2],
            file_name: "recording.webm".to_string(),
            mime_type: "audio/webm".to_string(),
        };
        assert_eq!(mock.transcribe(audio.clone()).await.unwrap(), "hello");
        assert_eq!(mock.last_audio(), Some(audio));
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockUpstream::failing(UpstreamError::Timeout);
        assert_eq!(mock.speech("x").await.unwrap_err(), UpstreamError::Timeout);
    }
}
