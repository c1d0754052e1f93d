//! Turn orchestrator: drives one request/response cycle.
//!
//! A turn appends the user message, asks the chat collaborator for a reply,
//! appends the assistant message and then, best effort, speaks the reply.
//! At most one turn runs per conversation. Collaborator calls are strictly
//! sequential and each is bounded by the configured timeout. Local playback
//! runs for as long as the clip does.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tonal_core::types::{AiResponse, AudioClip, ChatMessage, ChatRequest};

use crate::collaborator::Collaborators;
use crate::error::{ChatError, CollaboratorError, TurnStage};
use crate::state::{lock, SharedConversation};

/// What happened to the spoken reply of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The reply was synthesized and played.
    Played,
    /// Nothing to speak, or autoplay is off.
    Skipped,
    /// Synthesis or playback failed. The turn itself still succeeded.
    Failed(String),
}

/// Result of a successful turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub user_message_id: Uuid,
    pub assistant_message_id: Uuid,
    pub response: AiResponse,
    pub speech: SpeechOutcome,
}

/// Returns the conversation to Idle when dropped, on every exit path.
struct TurnGuard<'a> {
    state: &'a SharedConversation,
}

impl<'a> TurnGuard<'a> {
    fn begin(state: &'a SharedConversation) -> Result<Self, ChatError> {
        lock(state).begin_turn()?;
        Ok(Self { state })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).finish_turn();
    }
}

/// Coordinates collaborators and the shared conversation for each turn.
pub struct TurnOrchestrator {
    state: SharedConversation,
    collaborators: Collaborators,
    timeout: Duration,
    autoplay: bool,
}

impl TurnOrchestrator {
    pub fn new(state: SharedConversation, collaborators: Collaborators, timeout: Duration) -> Self {
        Self {
            state,
            collaborators,
            timeout,
            autoplay: true,
        }
    }

    /// Whether replies are spoken as part of the turn.
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn state(&self) -> &SharedConversation {
        &self.state
    }

    /// Run a turn for a typed utterance.
    pub async fn submit_text(&self, text: &str) -> Result<TurnReport, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = TurnGuard::begin(&self.state)?;
        self.run_turn(ChatMessage::user(text)).await
    }

    /// Run a turn for recorded speech.
    ///
    /// The clip is transcribed first. If transcription fails or yields no
    /// text, the turn ends without touching the message log.
    pub async fn submit_audio(&self, clip: &AudioClip) -> Result<TurnReport, ChatError> {
        if clip.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = TurnGuard::begin(&self.state)?;

        debug!(bytes = clip.len(), mime = %clip.mime_type, "Transcribing recording");
        let transcript = self
            .call(
                TurnStage::Transcription,
                self.collaborators.transcription.transcribe(clip),
            )
            .await
            .inspect_err(|e| error!("Audio turn aborted: {}", e))?;

        let transcript = transcript.trim();
        if transcript.is_empty() {
            warn!("Transcription returned no text");
            return Err(ChatError::EmptyMessage);
        }
        self.run_turn(ChatMessage::user_transcribed(transcript)).await
    }

    /// Synthesize and play the spoken text of a stored assistant message.
    ///
    /// Unlike the speech step inside a turn, failures here are returned.
    pub async fn replay_speech(&self, message_id: Uuid) -> Result<(), ChatError> {
        let text = {
            let state = lock(&self.state);
            let message = state
                .message(message_id)
                .ok_or(ChatError::MessageNotFound(message_id))?;
            message
                .speech_text()
                .ok_or(ChatError::NoSpeech(message_id))?
                .to_string()
        };
        self.speak(&text).await
    }

    /// Steps shared by text and audio turns, starting from the user message.
    async fn run_turn(&self, user_message: ChatMessage) -> Result<TurnReport, ChatError> {
        let request = ChatRequest {
            message: user_message.content.clone(),
            personality: lock(&self.state).personality(),
        };
        let user_message_id = user_message.id;
        lock(&self.state).append_message(user_message);

        let response = self
            .call(TurnStage::Chat, self.collaborators.chat.complete(&request))
            .await
            .inspect_err(|e| error!("Turn failed: {}", e))?;

        let assistant = ChatMessage::assistant(response.clone());
        let assistant_message_id = assistant.id;
        let speech_text = assistant.speech_text().map(str::to_string);
        lock(&self.state).append_message(assistant);
        info!(
            user = %user_message_id,
            assistant = %assistant_message_id,
            "Turn completed"
        );

        let speech = match speech_text {
            Some(text) if self.autoplay => match self.speak(&text).await {
                Ok(()) => SpeechOutcome::Played,
                Err(e) => {
                    warn!("Speaking reply failed: {}", e);
                    SpeechOutcome::Failed(e.to_string())
                }
            },
            _ => SpeechOutcome::Skipped,
        };

        Ok(TurnReport {
            user_message_id,
            assistant_message_id,
            response,
            speech,
        })
    }

    async fn speak(&self, text: &str) -> Result<(), ChatError> {
        let clip = self
            .call(TurnStage::Speech, self.collaborators.speech.synthesize(text))
            .await?;
        debug!(bytes = clip.len(), "Playing synthesized reply");
        self.collaborators
            .player
            .play(&clip)
            .await
            .map_err(|e| ChatError::collaborator(TurnStage::Playback, e))
    }

    async fn call<T, F>(&self, stage: TurnStage, fut: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| ChatError::collaborator(stage, e)),
            Err(_) => Err(ChatError::collaborator(
                stage,
                CollaboratorError::Timeout(self.timeout),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
