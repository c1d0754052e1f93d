//! External collaborators a turn talks to.
//!
//! The engine never knows whether these are HTTP clients, local mocks or
//! something else; it only awaits them through these traits.

use std::sync::Arc;

use async_trait::async_trait;

use tonal_core::types::{AiResponse, AudioClip, ChatRequest};

use crate::error::CollaboratorError;

/// Produces a personality-conditioned reply for one utterance.
#[async_trait]
pub trait ChatCollaborator: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<AiResponse, CollaboratorError>;
}

/// Turns recorded speech into text.
#[async_trait]
pub trait TranscriptionCollaborator: Send + Sync {
    async fn transcribe(&self, audio: &AudioClip) -> Result<String, CollaboratorError>;
}

/// Turns text into spoken audio.
#[async_trait]
pub trait SpeechCollaborator: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, CollaboratorError>;
}

/// Plays an audio clip to completion.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: &AudioClip) -> Result<(), CollaboratorError>;
}

/// The full set of collaborators a `TurnOrchestrator` drives.
#[derive(Clone)]
pub struct Collaborators {
    pub chat: Arc<dyn ChatCollaborator>,
    pub transcription: Arc<dyn TranscriptionCollaborator>,
    pub speech: Arc<dyn SpeechCollaborator>,
    pub player: Arc<dyn AudioPlayer>,
}

/// Player that discards audio. Used when no output device is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), CollaboratorError> {
        tracing::debug!(bytes = clip.len(), "Discarding audio clip");
        Ok(())
    }
}
