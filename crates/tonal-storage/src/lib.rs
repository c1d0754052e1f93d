//! Tonal Storage crate - SQLite persistence for saved chats.
//!
//! Provides a WAL-mode SQLite database with migrations, a small key-value
//! abstraction (SQLite-backed or in-memory), and the `ChatSessionStore`
//! repository that keeps every saved chat under one fixed key.

pub mod chat_store;
pub mod db;
pub mod kv;
pub mod migrations;

pub use chat_store::{ChatSessionStore, STORAGE_KEY};
pub use db::Database;
pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
