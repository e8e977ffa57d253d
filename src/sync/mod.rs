//! Sync orchestration
//!
//! A `Store` owns one collection in memory. Every accepted action is applied
//! locally first, persisted to the local cache after a debounce window and,
//! when a user is signed in, replicated to the remote store in the
//! background. Remote failures are logged and never roll local state back.

pub mod debounce;
pub mod family;
pub mod store;
pub mod tasks;

pub use debounce::SnapshotDebouncer;
pub use family::EntityFamily;
pub use store::{LoadStatus, Store, StoreView};
pub use tasks::{FailureHook, RemoteFailure, RemoteTaskQueue};

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::UserId;
use crate::reducer::{AchievementsReducer, DiaryReducer, HabitsReducer, SettingsReducer};
use crate::storage::{LocalStore, RemoteError, RemoteStore, StorageError};

/// Default quiet period before a local snapshot is written
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

pub type HabitsStore = Store<HabitsReducer>;
pub type DiaryStore = Store<DiaryReducer>;
pub type SettingsStore = Store<SettingsReducer>;
pub type AchievementsStore = Store<AchievementsReducer>;

/// Tunables shared by all stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period before a local snapshot is written
    pub debounce: Duration,
}

impl SyncConfig {
    pub fn with_debounce_ms(ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(ms),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::with_debounce_ms(DEFAULT_DEBOUNCE_MS)
    }
}

/// The four stores of an app, sharing one local cache, remote and task queue
#[derive(Clone)]
pub struct StoreSet {
    pub habits: HabitsStore,
    pub diary: DiaryStore,
    pub settings: SettingsStore,
    pub achievements: AchievementsStore,
    tasks: RemoteTaskQueue,
}

impl StoreSet {
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        let tasks = RemoteTaskQueue::new();
        Self {
            habits: Store::new(HabitsReducer, local.clone(), remote.clone(), tasks.clone(), config),
            diary: Store::new(DiaryReducer, local.clone(), remote.clone(), tasks.clone(), config),
            settings: Store::new(SettingsReducer, local.clone(), remote.clone(), tasks.clone(), config),
            achievements: Store::new(AchievementsReducer, local, remote, tasks.clone(), config),
            tasks,
        }
    }

    pub fn tasks(&self) -> &RemoteTaskQueue {
        &self.tasks
    }

    pub fn set_user_id(&self, user: Option<UserId>) {
        self.habits.set_user_id(user.clone());
        self.diary.set_user_id(user.clone());
        self.settings.set_user_id(user.clone());
        self.achievements.set_user_id(user);
    }

    /// Load every store, returning the first failure
    ///
    /// All four loads run even when one fails, so each store ends up with
    /// its own status.
    pub async fn load_all(&self, user: Option<&UserId>) -> Result<(), RemoteError> {
        let (habits, diary, settings, achievements) = futures::join!(
            self.habits.load(user),
            self.diary.load(user),
            self.settings.load(user),
            self.achievements.load(user),
        );
        habits.and(diary).and(settings).and(achievements)
    }

    /// Fetch every store from the remote regardless of status
    pub async fn reload_all(&self, user: &UserId) -> Result<(), RemoteError> {
        let (habits, diary, settings, achievements) = futures::join!(
            self.habits.reload(user),
            self.diary.reload(user),
            self.settings.reload(user),
            self.achievements.reload(user),
        );
        habits.and(diary).and(settings).and(achievements)
    }

    /// Write every pending local snapshot now
    pub fn flush_all(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for result in [
            self.habits.flush(),
            self.diary.flush(),
            self.settings.flush(),
            self.achievements.flush(),
        ] {
            if let Err(e) = result {
                warn!("Snapshot flush failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn wait_idle(&self) {
        self.tasks.wait_idle().await
    }
}
