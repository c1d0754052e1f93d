use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TonalError};

/// Top-level configuration for Tonal.
///
/// Loaded from `~/.tonal/config.toml` by default. Every section falls back
/// to its defaults when missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TonalConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl TonalConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TonalConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TonalError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Data directory with a leading `~` expanded against `$HOME`.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }
}

/// Expand a leading `~/` using the `HOME` (or `USERPROFILE`) variable.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
        if let Ok(home) = home {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for the chat database and reply audio.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Language of user-facing notices: "en" or "pt-BR".
    pub locale: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.tonal/data".to_string(),
            log_level: "info".to_string(),
            locale: "en".to_string(),
        }
    }
}

/// Proxy server bind settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
        }
    }
}

/// How the shell reaches the proxy endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the proxy, without the `/api` suffix.
    pub base_url: String,
    /// Ceiling for each collaborator call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3040".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Upstream model provider used by the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
    /// Ceiling for each upstream request, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            transcription_model: "whisper-1".to_string(),
            speech_model: "tts-1".to_string(),
            voice: "nova".to_string(),
            timeout_secs: 45,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Voice input and spoken replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Recordings stop automatically after this many seconds.
    pub max_recording_secs: u32,
    /// Speak assistant replies as soon as they arrive.
    pub autoplay: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_recording_secs: 120,
            autoplay: true,
        }
    }
}

/// Where synthesized replies go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// File name (inside the data dir) the latest reply is written to.
    pub output_file: String,
    /// Optional player command; the audio path is appended as last argument.
    pub command: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output_file: "last-reply.mp3".to_string(),
            command: None,
        }
    }
}
