//! The SQLite file behind Tonal's key-value store.
//!
//! One connection, shared behind a mutex. The schema is a single
//! `kv_store` table; saved chats are one row in it.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use tonal_core::error::TonalError;

use crate::migrations;

/// Wait this long for a competing writer (another `tonal` process) before
/// a read or write fails as locked.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Handle to `tonal.db`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the chat database at `path`, then bring its schema
    /// up to date.
    pub fn new(path: &Path) -> Result<Self, TonalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TonalError::Storage(format!("cannot open {}: {}", path.display(), e))
        })?;

        // A shell and a `tonal chats` listing may share the file.
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = {};",
            BUSY_TIMEOUT_MS
        ))
        .map_err(|e| TonalError::Storage(format!("cannot configure {}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Chat database ready");

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// A throwaway database that lives as long as the handle.
    pub fn in_memory() -> Result<Self, TonalError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TonalError::Storage(format!("cannot open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` against the connection while holding the lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, TonalError>
    where
        F: FnOnce(&Connection) -> Result<T, TonalError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TonalError::Storage(format!("chat database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
