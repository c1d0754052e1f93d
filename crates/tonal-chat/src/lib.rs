//! Tonal chat crate - the conversation engine.
//!
//! Holds the in-memory conversation state machine, drives request/response
//! turns through pluggable collaborators, records voice input, and manages
//! saving and loading of chats.

pub mod collaborator;
pub mod error;
pub mod mock;
pub mod notice;
pub mod orchestrator;
pub mod sessions;
pub mod state;
pub mod voice;

pub use collaborator::{
    AudioPlayer, ChatCollaborator, Collaborators, NullPlayer, SpeechCollaborator,
    TranscriptionCollaborator,
};
pub use error::{ChatError, CollaboratorError, TurnStage};
pub use notice::{default_chat_name, Locale, Notice};
pub use orchestrator::{SpeechOutcome, TurnOrchestrator, TurnReport};
pub use sessions::SessionManager;
pub use state::{ConversationState, SharedConversation, TurnPhase};
pub use voice::{AudioSource, VoiceRecorder};
