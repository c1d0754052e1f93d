//! Saved-chat repository.
//!
//! Every saved chat lives in one JSON array stored under [`STORAGE_KEY`].
//! Each mutation reads the whole collection, edits it, and writes it back
//! as a single value, so a reader never observes a half-applied change.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use tonal_core::error::TonalError;
use tonal_core::types::SavedChat;

use crate::kv::KeyValueStore;

/// Fixed key holding the serialized collection.
pub const STORAGE_KEY: &str = "saved-chats";

/// Repository of named conversation snapshots.
#[derive(Clone)]
pub struct ChatSessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ChatSessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// All saved chats in insertion order.
    ///
    /// Missing data is an empty list. Unreadable data is logged and also
    /// treated as empty; use [`try_list`](Self::try_list) to see the fault.
    pub fn list(&self) -> Vec<SavedChat> {
        match self.try_list() {
            Ok(chats) => chats,
            Err(e) => {
                warn!("Ignoring saved chats: {}", e);
                Vec::new()
            }
        }
    }

    /// All saved chats, failing with `StorageCorrupt` when the stored
    /// collection cannot be parsed.
    pub fn try_list(&self) -> Result<Vec<SavedChat>, TonalError> {
        let Some(raw) = self.kv.get(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| TonalError::StorageCorrupt(e.to_string()))
    }

    /// Find one saved chat by id.
    pub fn get(&self, id: Uuid) -> Result<Option<SavedChat>, TonalError> {
        Ok(self.try_list()?.into_iter().find(|c| c.id == id))
    }

    /// Insert a chat, or replace the stored chat with the same id in place.
    ///
    /// A collection that cannot be parsed is replaced by one holding only
    /// `chat`. Any other read failure is returned and nothing is written.
    pub fn upsert(&self, chat: &SavedChat) -> Result<(), TonalError> {
        let mut chats = match self.try_list() {
            Ok(chats) => chats,
            Err(TonalError::StorageCorrupt(e)) => {
                warn!("Replacing unreadable saved chats: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => {
                *existing = chat.clone();
                debug!(id = %chat.id, name = %chat.name, "Replaced saved chat");
            }
            None => {
                chats.push(chat.clone());
                debug!(id = %chat.id, name = %chat.name, "Added saved chat");
            }
        }
        self.write_all(&chats)
    }

    /// Remove the chat with `id`. Removing an unknown id is a no-op.
    pub fn delete(&self, id: Uuid) -> Result<(), TonalError> {
        let mut chats = self.try_list()?;
        let before = chats.len();
        chats.retain(|c| c.id != id);
        if chats.len() == before {
            debug!(%id, "Delete of unknown chat ignored");
            return Ok(());
        }
        self.write_all(&chats)
    }

    fn write_all(&self, chats: &[SavedChat]) -> Result<(), TonalError> {
        let raw = serde_json::to_string(chats)?;
        self.kv.set(STORAGE_KEY, &raw)
    }
}

impl std::fmt::Debug for ChatSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSessionStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::{MemoryKeyValueStore, SqliteKeyValueStore};
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tonal_core::personality::Preset;
    use tonal_core::types::{AiResponse, ChatMessage};

    fn memory_store() -> (ChatSessionStore, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        (ChatSessionStore::new(kv.clone()), kv)
    }

    /// Memory store whose next read fails like a locked database.
    #[derive(Default)]
    struct LockedOnce {
        inner: MemoryKeyValueStore,
        fail_next_get: AtomicBool,
    }

    impl KeyValueStore for LockedOnce {
        fn get(&self, key: &str) -> Result<Option<String>, TonalError> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(TonalError::Storage("database is locked".to_string()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), TonalError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), TonalError> {
            self.inner.remove(key)
        }
    }

    fn sample_chat(name: &str) -> SavedChat {
        let reply = AiResponse {
            text_short: "Sure thing.".to_string(),
            text_long: "Sure thing, here is the long answer.".to_string(),
            speech_text: "Sure thing!".to_string(),
            tone_summary: Preset::Funny.config(),
            action: vec!["Try again".to_string(), "Share".to_string()],
        };
        SavedChat {
            id: Uuid::new_v4(),
            name: name.to_string(),
            date: Utc::now(),
            personality: Preset::Sarcastic.config(),
            messages: vec![
                ChatMessage::user_transcribed("tell me a joke"),
                ChatMessage::assistant(reply),
            ],
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let (store, _) = memory_store();
        assert!(store.list().is_empty());
        assert!(store.try_list().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_then_get_round_trip() {
        let (store, _) = memory_store();
        let chat = sample_chat("Jokes");
        store.upsert(&chat).unwrap();

        let loaded = store.get(chat.id).unwrap().unwrap();
        assert_eq!(loaded, chat);
    }

    #[test]
    fn test_upsert_twice_keeps_one_entry() {
        let (store, _) = memory_store();
        let chat = sample_chat("Once");
        store.upsert(&chat).unwrap();
        store.upsert(&chat).unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_resave_replaces_in_place() {
        let (store, _) = memory_store();
        let first = sample_chat("First");
        let second = sample_chat("Second");
        let third = sample_chat("Third");
        store.upsert(&first).unwrap();
        store.upsert(&second).unwrap();
        store.upsert(&third).unwrap();

        let mut renamed = second.clone();
        renamed.name = "Second, renamed".to_string();
        renamed.messages.push(ChatMessage::user("one more"));
        store.upsert(&renamed).unwrap();

        let names: Vec<String> = store.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["First", "Second, renamed", "Third"]);
        assert_eq!(store.get(second.id).unwrap().unwrap().messages.len(), 3);
    }

    #[test]
    fn test_delete_removes_only_target() {
        let (store, _) = memory_store();
        let keep = sample_chat("Keep");
        let drop_me = sample_chat("Drop");
        store.upsert(&keep).unwrap();
        store.upsert(&drop_me).unwrap();

        store.delete(drop_me.id).unwrap();
        let remaining = store.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let (store, kv) = memory_store();
        let chat = sample_chat("Only");
        store.upsert(&chat).unwrap();
        let before = kv.get(STORAGE_KEY).unwrap();

        store.delete(Uuid::new_v4()).unwrap();
        assert_eq!(kv.get(STORAGE_KEY).unwrap(), before);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_corrupt_collection() {
        let (store, kv) = memory_store();
        kv.set(STORAGE_KEY, "{not json").unwrap();

        assert!(store.list().is_empty());
        assert!(matches!(
            store.try_list().unwrap_err(),
            TonalError::StorageCorrupt(_)
        ));
        assert!(store.get(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_upsert_over_corrupt_collection_recovers() {
        let (store, kv) = memory_store();
        kv.set(STORAGE_KEY, "[{\"oops\": true}]").unwrap();

        let chat = sample_chat("Fresh");
        store.upsert(&chat).unwrap();
        assert_eq!(store.try_list().unwrap(), vec![chat]);
    }

    #[test]
    fn test_upsert_after_failed_read_keeps_existing_chats() {
        let kv = Arc::new(LockedOnce::default());
        let store = ChatSessionStore::new(kv.clone());
        let a = sample_chat("A");
        let b = sample_chat("B");
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();

        kv.fail_next_get.store(true, Ordering::SeqCst);
        let err = store.upsert(&sample_chat("C")).unwrap_err();
        assert!(matches!(err, TonalError::Storage(_)));

        let names: Vec<String> = store.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["A", "B"]);

        store.upsert(&sample_chat("C")).unwrap();
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn test_collection_is_single_json_array() {
        let (store, kv) = memory_store();
        store.upsert(&sample_chat("A")).unwrap();
        store.upsert(&sample_chat("B")).unwrap();

        let raw = kv.get(STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_sqlite_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.db");
        let chat = sample_chat("Persistent");
        {
            let kv = SqliteKeyValueStore::new(Arc::new(Database::new(&path).unwrap()));
            ChatSessionStore::new(Arc::new(kv)).upsert(&chat).unwrap();
        }
        let kv = SqliteKeyValueStore::new(Arc::new(Database::new(&path).unwrap()));
        let store = ChatSessionStore::new(Arc::new(kv));
        assert_eq!(store.list(), vec![chat]);
    }
}
