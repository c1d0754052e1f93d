//! Conversation state machine.
//!
//! Tracks the active conversation and enforces the turn lifecycle:
//! - Idle -> Processing (a turn was submitted)
//! - Processing -> Idle (the turn finished, successfully or not)
//!
//! Anything that would replace the conversation (reset, load) is only
//! allowed while Idle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use tonal_core::personality::{
    apply_trait_edit, default_personality, PersonalityConfig, PersonalityTrait, Preset,
};
use tonal_core::types::{ChatMessage, SavedChat};

use crate::error::ChatError;

/// Phase of the active conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    /// Ready for the next turn.
    Idle,
    /// A turn is in flight.
    Processing,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Idle => write!(f, "Idle"),
            TurnPhase::Processing => write!(f, "Processing"),
        }
    }
}

impl TurnPhase {
    pub fn can_transition_to(&self, target: &TurnPhase) -> bool {
        matches!(
            (self, target),
            (TurnPhase::Idle, TurnPhase::Processing) | (TurnPhase::Processing, TurnPhase::Idle)
        )
    }
}

/// Conversation shared between the orchestrator, the recorder and the shell.
///
/// The lock is never held across an `.await`.
pub type SharedConversation = Arc<Mutex<ConversationState>>;

/// Lock a shared conversation, recovering the data from a poisoned lock.
pub fn lock(state: &SharedConversation) -> MutexGuard<'_, ConversationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The in-memory active conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    phase: TurnPhase,
    personality: PersonalityConfig,
    active_preset: Option<Preset>,
    messages: Vec<ChatMessage>,
    session_id: Option<Uuid>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    /// A fresh conversation: empty log, default personality, unbound.
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Idle,
            personality: default_personality(),
            active_preset: Some(Preset::DEFAULT),
            messages: Vec::new(),
            session_id: None,
        }
    }

    pub fn shared(self) -> SharedConversation {
        Arc::new(Mutex::new(self))
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TurnPhase::Idle
    }

    pub fn personality(&self) -> PersonalityConfig {
        self.personality
    }

    /// The preset the personality came from, or `None` once edited by hand.
    pub fn active_preset(&self) -> Option<Preset> {
        self.active_preset
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Id of the saved chat this conversation was loaded from or saved as.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Start over with a fresh conversation.
    pub fn reset(&mut self) -> Result<(), ChatError> {
        self.ensure_idle()?;
        tracing::debug!(dropped = self.messages.len(), "Conversation reset");
        *self = Self::new();
        Ok(())
    }

    /// Replace the conversation wholesale with a saved snapshot.
    pub fn load_from(&mut self, saved: &SavedChat) -> Result<(), ChatError> {
        self.ensure_idle()?;
        self.personality = saved.personality;
        self.active_preset = Preset::matching(&saved.personality);
        self.messages = saved.messages.clone();
        self.session_id = Some(saved.id);
        tracing::debug!(
            id = %saved.id,
            messages = self.messages.len(),
            "Conversation loaded"
        );
        Ok(())
    }

    /// Select a preset, replacing the whole personality vector.
    pub fn apply_preset(&mut self, preset: Preset) {
        self.personality = preset.config();
        self.active_preset = Some(preset);
    }

    /// Change one trait. Clears the active preset marker.
    pub fn edit_trait(&mut self, trait_name: PersonalityTrait, value: i32) -> Result<(), ChatError> {
        self.personality = apply_trait_edit(self.personality, trait_name, value)?;
        self.active_preset = None;
        Ok(())
    }

    /// Whether there is anything worth saving.
    pub fn can_save(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Point-in-time copy of the conversation under `id` and `name`.
    pub fn snapshot(&self, id: Uuid, name: &str) -> SavedChat {
        SavedChat {
            id,
            name: name.to_string(),
            date: Utc::now(),
            personality: self.personality,
            messages: self.messages.clone(),
        }
    }

    pub(crate) fn bind_session(&mut self, id: Uuid) {
        self.session_id = Some(id);
    }

    pub(crate) fn begin_turn(&mut self) -> Result<(), ChatError> {
        self.transition(TurnPhase::Processing)
    }

    pub(crate) fn finish_turn(&mut self) {
        if self.transition(TurnPhase::Idle).is_err() {
            tracing::warn!("Turn finished while already Idle");
        }
    }

    pub(crate) fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    fn transition(&mut self, target: TurnPhase) -> Result<(), ChatError> {
        if self.phase.can_transition_to(&target) {
            tracing::debug!("Conversation phase: {} -> {}", self.phase, target);
            self.phase = target;
            Ok(())
        } else {
            Err(ChatError::Busy)
        }
    }

    fn ensure_idle(&self) -> Result<(), ChatError> {
        match self.phase {
            TurnPhase::Idle => Ok(()),
            TurnPhase::Processing => Err(ChatError::Busy),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
