//! Storage layer: local key/value cache and remote table store
//!
//! The local adapter is synchronous and holds JSON snapshots of each
//! collection plus a few session values. The remote adapter is asynchronous
//! and mirrors the four user-scoped tables.

pub mod local;
pub mod memory;
pub mod migrations;
pub mod remote;
pub mod sqlite;

// Re-export the main storage types
pub use local::*;
pub use memory::{MemoryRemote, RemoteCall};
pub use remote::*;
pub use sqlite::SqliteRemote;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Local snapshot key for the habit collection
pub const HABITS_KEY: &str = "habits";
/// Local snapshot key for settings
pub const SETTINGS_KEY: &str = "settings";
/// Local snapshot key for achievements
pub const ACHIEVEMENTS_KEY: &str = "achievements";
/// Local snapshot key for the main diary
pub const MAIN_DIARY_KEY: &str = "mainDiary";

/// Errors that can occur during local storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Device-persistent key/value store
///
/// Used as the offline cache for collection snapshots and for a handful of
/// session values. Calls are synchronous and expected to be fast.
pub trait LocalStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Forget `key`
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON snapshot
pub fn load_snapshot<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON snapshot
pub fn save_snapshot<T: Serialize + ?Sized>(store: &dyn LocalStore, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
