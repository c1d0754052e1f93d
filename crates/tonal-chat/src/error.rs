//! Error types for the conversation engine.

use std::fmt;
use std::time::Duration;

use tonal_core::error::TonalError;
use tonal_core::personality::PersonalityError;
use uuid::Uuid;

/// Which collaborator call of a turn failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnStage {
    Transcription,
    Chat,
    Speech,
    Playback,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnStage::Transcription => write!(f, "transcription"),
            TurnStage::Chat => write!(f, "chat"),
            TurnStage::Speech => write!(f, "speech synthesis"),
            TurnStage::Playback => write!(f, "playback"),
        }
    }
}

/// Failure of an external collaborator (chat, transcription, speech, player).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collaborator returned status {status}: {details}")]
    Status { status: u16, details: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the conversation engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a turn is already in progress")]
    Busy,
    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: TurnStage,
        #[source]
        source: CollaboratorError,
    },
    #[error("saved chat not found: {0}")]
    SessionNotFound(Uuid),
    #[error("message not found: {0}")]
    MessageNotFound(Uuid),
    #[error("message {0} has nothing to speak")]
    NoSpeech(Uuid),
    #[error("conversation is empty, nothing to save")]
    NothingToSave,
    #[error("chat name cannot be empty")]
    EmptyName,
    #[error("voice error: {0}")]
    Voice(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Personality(#[from] PersonalityError),
}

impl ChatError {
    pub fn collaborator(stage: TurnStage, source: CollaboratorError) -> Self {
        ChatError::Collaborator { stage, source }
    }

    /// Stage of the failed collaborator call, if this is a collaborator failure.
    pub fn stage(&self) -> Option<TurnStage> {
        match self {
            ChatError::Collaborator { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<TonalError> for ChatError {
    fn from(err: TonalError) -> Self {
        ChatError::Storage(err.to_string())
    }
}
