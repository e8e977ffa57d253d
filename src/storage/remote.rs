//! Remote persistence interface
//!
//! The remote store is a table-based service where every row belongs to one
//! user. Each entity family gets its own adapter trait; `RemoteStore` is the
//! union the sync layer is handed.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Achievement, DiaryEntry, Habit, HabitPatch, RemoteId, Settings, UserId};

/// Errors reported by a remote store
///
/// Cloneable so one failure can be both logged and handed to a failure hook.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Remote store rejected the request: {0}")]
    Rejected(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Remote serialization error: {0}")]
    Serialization(String),

    #[error("Remote database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

/// The `habits` table
#[async_trait]
pub trait HabitsRemote: Send + Sync {
    /// All habits owned by `user`, newest row first, each with its remote id
    async fn fetch_habits(&self, user: &UserId) -> Result<Vec<Habit>, RemoteError>;

    /// Insert one habit and return the id the store assigned
    async fn insert_habit(&self, user: &UserId, habit: &Habit) -> Result<RemoteId, RemoteError>;

    /// Apply a partial update to one habit
    async fn update_habit(&self, user: &UserId, id: &RemoteId, patch: &HabitPatch) -> Result<(), RemoteError>;

    async fn delete_habit(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError>;

    /// Delete every habit of `user`, then insert `habits`
    ///
    /// A later `fetch_habits` returns them in the given order.
    async fn replace_habits(&self, user: &UserId, habits: &[Habit]) -> Result<Vec<RemoteId>, RemoteError>;
}

/// The `user_settings` table (one row per user)
#[async_trait]
pub trait SettingsRemote: Send + Sync {
    /// `None` when the user has no settings row yet
    async fn fetch_settings(&self, user: &UserId) -> Result<Option<Settings>, RemoteError>;

    async fn upsert_settings(&self, user: &UserId, settings: &Settings) -> Result<(), RemoteError>;
}

/// The `user_achievements` table (one row per user)
#[async_trait]
pub trait AchievementsRemote: Send + Sync {
    /// `None` when the user has no achievements row yet
    async fn fetch_achievements(&self, user: &UserId) -> Result<Option<Vec<Achievement>>, RemoteError>;

    async fn upsert_achievements(&self, user: &UserId, achievements: &[Achievement]) -> Result<(), RemoteError>;
}

/// The `main_diary` table
#[async_trait]
pub trait DiaryRemote: Send + Sync {
    /// All entries owned by `user`, most recent date first
    async fn fetch_diary(&self, user: &UserId) -> Result<Vec<DiaryEntry>, RemoteError>;

    async fn insert_diary_entry(&self, user: &UserId, entry: &DiaryEntry) -> Result<RemoteId, RemoteError>;

    async fn update_diary_entry(&self, user: &UserId, id: &RemoteId, text: &str) -> Result<(), RemoteError>;

    async fn delete_diary_entry(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError>;

    /// Delete every entry of `user`, then insert `entries`
    async fn replace_diary(&self, user: &UserId, entries: &[DiaryEntry]) -> Result<(), RemoteError>;
}

/// A remote store serving all four entity families
pub trait RemoteStore: HabitsRemote + SettingsRemote + AchievementsRemote + DiaryRemote {}

impl<T> RemoteStore for T where T: HabitsRemote + SettingsRemote + AchievementsRemote + DiaryRemote {}
