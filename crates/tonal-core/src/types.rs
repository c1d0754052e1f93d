use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::personality::PersonalityConfig;

// =============================================================================
// Conversation
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Structured reply produced by the chat collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    /// Short text shown as the message body.
    pub text_short: String,
    /// Longer, detailed answer.
    #[serde(default)]
    pub text_long: String,
    /// Variant of the answer written to be spoken aloud.
    #[serde(default)]
    pub speech_text: String,
    /// The tone the model says it actually used.
    #[serde(default)]
    pub tone_summary: PersonalityConfig,
    /// Suggested follow-up actions, in order.
    #[serde(default)]
    pub action: Vec<String>,
}

/// A single entry in a conversation log. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    /// Display content.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Transcribed speech, for user turns that started as audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    /// Full structured reply, for assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AiResponse>,
}

impl ChatMessage {
    /// A typed user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            transcription: None,
            response: None,
        }
    }

    /// A user message whose content came from transcribed audio.
    pub fn user_transcribed(transcript: impl Into<String>) -> Self {
        let transcript = transcript.into();
        Self {
            transcription: Some(transcript.clone()),
            ..Self::user(transcript)
        }
    }

    /// An assistant message displaying the short text of `response`.
    pub fn assistant(response: AiResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: response.text_short.clone(),
            timestamp: Utc::now(),
            transcription: None,
            response: Some(response),
        }
    }

    /// Text to speak for this message, if it has any.
    pub fn speech_text(&self) -> Option<&str> {
        self.response
            .as_ref()
            .map(|r| r.speech_text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

/// A named, point-in-time snapshot of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedChat {
    /// Stable across re-saves of the same chat.
    pub id: Uuid,
    pub name: String,
    /// When the snapshot was taken.
    pub date: DateTime<Utc>,
    pub personality: PersonalityConfig,
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// Collaborator wire types
// =============================================================================

/// Body of a chat completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub personality: PersonalityConfig,
}

/// Body returned by the transcription endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Body of a speech synthesis request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

/// An opaque audio payload with its container type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `audio/webm` or `audio/mpeg`.
    pub mime_type: String,
}

impl AudioClip {
    /// MIME type of recorded speech sent for transcription.
    pub const RECORDING_MIME: &'static str = "audio/webm";
    /// MIME type of synthesized speech.
    pub const SPEECH_MIME: &'static str = "audio/mpeg";

    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn recording(bytes: Vec<u8>) -> Self {
        Self::new(bytes, Self::RECORDING_MIME)
    }

    pub fn speech(bytes: Vec<u8>) -> Self {
        Self::new(bytes, Self::SPEECH_MIME)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/ogg" => "ogg",
            "audio/mp4" | "audio/m4a" => "m4a",
            _ => "webm",
        }
    }
}
