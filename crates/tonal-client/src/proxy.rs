//! HTTP client for the Tonal proxy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use tonal_chat::collaborator::{ChatCollaborator, SpeechCollaborator, TranscriptionCollaborator};
use tonal_chat::error::CollaboratorError;
use tonal_core::config::ClientConfig;
use tonal_core::types::{
    AiResponse, AudioClip, ChatRequest, SpeechRequest, TranscriptionResponse,
};

/// Error body returned by the proxy on non-success responses.
#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl ProxyErrorBody {
    fn describe(&self) -> String {
        let mut text = if self.message.is_empty() {
            self.error.clone()
        } else {
            self.message.clone()
        };
        match &self.details {
            Some(serde_json::Value::String(s)) if !s.is_empty() => {
                text.push_str(": ");
                text.push_str(s);
            }
            Some(serde_json::Value::Null) | None => {}
            Some(other) => {
                text.push_str(": ");
                text.push_str(&other.to_string());
            }
        }
        text
    }
}

/// Chat, transcription and speech collaborators over HTTP.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ProxyClient {
    /// Client for the proxy at `base_url` (without the `/api` suffix).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CollaboratorError> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport_error(&self, err: reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout(self.timeout)
        } else if err.is_decode() {
            CollaboratorError::Decode(err.to_string())
        } else {
            CollaboratorError::Transport(err.to_string())
        }
    }

    async fn check(&self, response: Response) -> Result<Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.text().await.unwrap_or_default();
        let details = serde_json::from_str::<ProxyErrorBody>(&raw)
            .map(|body| body.describe())
            .unwrap_or(raw);
        warn!(status = status.as_u16(), "Proxy returned an error: {}", details);
        Err(CollaboratorError::Status {
            status: status.as_u16(),
            details,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, CollaboratorError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check(response).await
    }

    /// Check that the proxy is up.
    pub async fn health(&self) -> Result<(), CollaboratorError> {
        self.send(self.client.get(self.endpoint("health"))).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatCollaborator for ProxyClient {
    async fn complete(&self, request: &ChatRequest) -> Result<AiResponse, CollaboratorError> {
        debug!(chars = request.message.len(), "POST /api/chat");
        let response = self
            .send(self.client.post(self.endpoint("api/chat")).json(request))
            .await?;
        response
            .json::<AiResponse>()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TranscriptionCollaborator for ProxyClient {
    async fn transcribe(&self, audio: &AudioClip) -> Result<String, CollaboratorError> {
        debug!(bytes = audio.len(), "POST /api/transcribe");
        let part = Part::bytes(audio.bytes.clone())
            .file_name(format!("recording.{}", audio.extension()))
            .mime_str(&audio.mime_type)
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        let form = Form::new().part("audio", part);

        let response = self
            .send(self.client.post(self.endpoint("api/transcribe")).multipart(form))
            .await?;
        let body = response
            .json::<TranscriptionResponse>()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;
        Ok(body.text)
    }
}

#[async_trait]
impl SpeechCollaborator for ProxyClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, CollaboratorError> {
        debug!(chars = text.len(), "POST /api/tts");
        let body = SpeechRequest {
            text: text.to_string(),
        };
        let response = self
            .send(self.client.post(self.endpoint("api/tts")).json(&body))
            .await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(AudioClip::SPEECH_MIME)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        if bytes.is_empty() {
            return Err(CollaboratorError::Decode("empty audio response".to_string()));
        }
        Ok(AudioClip::new(bytes.to_vec(), mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tonal_api::upstream::{MockUpstream, Upstream, UpstreamAudio, UpstreamError};
    use tonal_api::{create_router, AppState};
    use tonal_core::personality::Preset;

    const REPLY: &str = r#"{"text_short": "Hi!", "speech_text": "Hi there!"}"#;

    /// Serve the real proxy router on an ephemeral local port.
    async fn spawn_proxy(upstream: Arc<dyn Upstream>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(AppState::new(upstream));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn client_for(upstream: Arc<dyn Upstream>) -> ProxyClient {
        let addr = spawn_proxy(upstream).await;
        ProxyClient::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    fn hello() -> ChatRequest {
        ChatRequest {
            message: "Hello".to_string(),
            personality: Preset::Funny.config(),
        }
    }

    /// Upstream that never answers in time.
    struct SlowUpstream;

    #[async_trait]
    impl Upstream for SlowUpstream {
        async fn chat_completion(&self, _: &str, _: &str) -> Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(REPLY.to_string())
        }

        async fn transcribe(&self, _: UpstreamAudio) -> Result<String, UpstreamError> {
            Ok(String::new())
        }

        async fn speech(&self, _: &str) -> Result<Vec<u8>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_endpoint_joining() {
        let client = ProxyClient::new("http://localhost:3040/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3040");
        assert_eq!(client.endpoint("/api/chat"), "http://localhost:3040/api/chat");
    }

    #[test]
    fn test_error_body_description() {
        let body: ProxyErrorBody = serde_json::from_str(
            r#"{"error": "bad_gateway", "message": "upstream returned status 401", "details": "invalid key"}"#,
        )
        .unwrap();
        assert_eq!(body.describe(), "upstream returned status 401: invalid key");

        let body: ProxyErrorBody = serde_json::from_str(r#"{"error": "bad_request"}"#).unwrap();
        assert_eq!(body.describe(), "bad_request");
    }

    #[tokio::test]
    async fn test_health() {
        let client = client_for(Arc::new(MockUpstream::replying(REPLY))).await;
        client.health().await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_through_proxy() {
        let client = client_for(Arc::new(MockUpstream::replying(REPLY))).await;
        let response = client.complete(&hello()).await.unwrap();
        assert_eq!(response.text_short, "Hi!");
        assert_eq!(response.speech_text, "Hi there!");
        assert_eq!(response.tone_summary, Preset::Funny.config());
    }

    #[tokio::test]
    async fn test_transcribe_through_proxy() {
        let upstream = Arc::new(MockUpstream::replying(REPLY).with_transcript("turn it up"));
        let client = client_for(upstream.clone()).await;

        let text = client
            .transcribe(&AudioClip::recording(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(text, "turn it up");

        let forwarded = upstream.last_audio().unwrap();
        assert_eq!(forwarded.file_name, "recording.webm");
        assert_eq!(forwarded.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_synthesize_through_proxy() {
        let upstream = Arc::new(MockUpstream::replying(REPLY).with_audio(b"ID3abc".to_vec()));
        let client = client_for(upstream).await;

        let clip = client.synthesize("Hi there!").await.unwrap();
        assert_eq!(clip.mime_type, "audio/mpeg");
        assert_eq!(clip.bytes, b"ID3abc".to_vec());
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_status_error() {
        let upstream = Arc::new(MockUpstream::failing(UpstreamError::Status {
            status: 401,
            body: "invalid key".to_string(),
        }));
        let client = client_for(upstream).await;

        let err = client.complete(&hello()).await.unwrap_err();
        assert_eq!(
            err,
            CollaboratorError::Status {
                status: 502,
                details: "upstream returned status 401: invalid key".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_validation_failure_becomes_status_error() {
        let client = client_for(Arc::new(MockUpstream::replying(REPLY))).await;
        let err = client.synthesize("   ").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ProxyClient::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let err = client.complete(&hello()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_proxy_times_out() {
        let addr = spawn_proxy(Arc::new(SlowUpstream)).await;
        let client =
            ProxyClient::new(format!("http://{}", addr), Duration::from_millis(100)).unwrap();

        let err = client.complete(&hello()).await.unwrap_err();
        assert_eq!(err, CollaboratorError::Timeout(Duration::from_millis(100)));
    }
}
