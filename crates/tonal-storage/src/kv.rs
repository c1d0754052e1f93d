//! Key-value backends for whole-document persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::OptionalExtension;

use tonal_core::error::TonalError;

use crate::db::Database;

/// A string-to-string store where every write replaces one whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TonalError>;
    fn set(&self, key: &str, value: &str) -> Result<(), TonalError>;
    fn remove(&self, key: &str) -> Result<(), TonalError>;
}

/// SQLite-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db: Arc<Database>,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, TonalError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TonalError::Storage(format!("Failed to read '{}': {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TonalError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                rusqlite::params![key, value, Utc::now().timestamp()],
            )
            .map_err(|e| TonalError::Storage(format!("Failed to write '{}': {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), TonalError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| TonalError::Storage(format!("Failed to delete '{}': {}", key, e)))?;
            Ok(())
        })
    }
}

/// Process-local key-value store, used in tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, TonalError> {
        let values = self
            .values
            .lock()
            .map_err(|e| TonalError::Storage(format!("kv lock poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TonalError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| TonalError::Storage(format!("kv lock poisoned: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TonalError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| TonalError::Storage(format!("kv lock poisoned: {}", e)))?;
        values.remove(key);
        Ok(())
    }
}
