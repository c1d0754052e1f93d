//! Saving, loading and deleting chats.
//!
//! The store is only touched on explicit user actions, never in the
//! middle of a turn.

use tracing::info;
use uuid::Uuid;

use tonal_core::types::SavedChat;
use tonal_storage::ChatSessionStore;

use crate::error::ChatError;
use crate::state::{lock, SharedConversation};

/// Bridges the active conversation and the saved-chat store.
#[derive(Debug, Clone)]
pub struct SessionManager {
    state: SharedConversation,
    store: ChatSessionStore,
}

impl SessionManager {
    pub fn new(state: SharedConversation, store: ChatSessionStore) -> Self {
        Self { state, store }
    }

    /// Saved chats in stored order. Unreadable storage lists as empty.
    pub fn list(&self) -> Vec<SavedChat> {
        self.store.list()
    }

    /// Save the active conversation under `name`.
    ///
    /// A conversation that was loaded or saved before keeps its id, so the
    /// stored copy is replaced in place.
    pub fn save(&self, name: &str) -> Result<SavedChat, ChatError> {
        let name = name.trim();
        let mut state = lock(&self.state);
        if !state.can_save() {
            return Err(ChatError::NothingToSave);
        }
        if name.is_empty() {
            return Err(ChatError::EmptyName);
        }

        let id = state.session_id().unwrap_or_else(Uuid::new_v4);
        let snapshot = state.snapshot(id, name);
        self.store.upsert(&snapshot)?;
        state.bind_session(id);
        info!(%id, name, messages = snapshot.messages.len(), "Chat saved");
        Ok(snapshot)
    }

    /// Replace the active conversation with the saved chat `id`.
    pub fn load(&self, id: Uuid) -> Result<SavedChat, ChatError> {
        let saved = self.store.get(id)?.ok_or(ChatError::SessionNotFound(id))?;
        lock(&self.state).load_from(&saved)?;
        info!(%id, name = %saved.name, "Chat loaded");
        Ok(saved)
    }

    /// Delete a saved chat. Returns true when the active conversation was
    /// bound to it and has been reset.
    pub fn delete(&self, id: Uuid) -> Result<bool, ChatError> {
        let mut state = lock(&self.state);
        let bound = state.session_id() == Some(id);
        if bound && !state.is_idle() {
            return Err(ChatError::Busy);
        }

        self.store.delete(id)?;
        if bound {
            state.reset()?;
        }
        info!(%id, reset = bound, "Chat deleted");
        Ok(bound)
    }

    /// Start a fresh, unbound conversation.
    pub fn new_chat(&self) -> Result<(), ChatError> {
        lock(&self.state).reset()
    }
}
