//! In-memory remote store
//!
//! Behaves like the hosted backend (user-scoped rows, remote-assigned ids,
//! newest-first reads) and additionally records every call and can be told
//! to fail or to respond slowly. Used by tests and by the CLI when no remote
//! database is configured for a signed-in user.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Achievement, DiaryEntry, Habit, HabitKey, HabitPatch, RemoteId, Settings, UserId};
use crate::storage::{AchievementsRemote, DiaryRemote, HabitsRemote, RemoteError, SettingsRemote};

/// One recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchHabits,
    InsertHabit { title: String },
    UpdateHabit { id: RemoteId },
    DeleteHabit { id: RemoteId },
    ReplaceHabits { count: usize },
    FetchSettings,
    UpsertSettings,
    FetchAchievements,
    UpsertAchievements { count: usize },
    FetchDiary,
    InsertDiaryEntry,
    UpdateDiaryEntry { id: RemoteId },
    DeleteDiaryEntry { id: RemoteId },
    ReplaceDiary { count: usize },
}

impl RemoteCall {
    /// Whether this call changes remote state
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            RemoteCall::FetchHabits | RemoteCall::FetchSettings | RemoteCall::FetchAchievements | RemoteCall::FetchDiary
        )
    }
}

#[derive(Default)]
struct Tables {
    /// Insertion order; reads reverse it
    habits: HashMap<UserId, Vec<Habit>>,
    settings: HashMap<UserId, Settings>,
    achievements: HashMap<UserId, Vec<Achievement>>,
    diary: HashMap<UserId, Vec<DiaryEntry>>,
    next_id: u64,
    calls: Vec<RemoteCall>,
    failure: Option<RemoteError>,
    latency: Option<Duration>,
}

impl Tables {
    fn assign_id(&mut self, prefix: &str) -> RemoteId {
        self.next_id += 1;
        RemoteId::new(format!("{}-{}", prefix, self.next_id))
    }
}

#[derive(Default)]
pub struct MemoryRemote {
    tables: Mutex<Tables>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error` (or succeed again with `None`)
    pub fn set_failure(&self, error: Option<RemoteError>) {
        self.lock().failure = error;
    }

    /// Delay every following call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Calls that changed (or tried to change) remote state
    pub fn writes(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(RemoteCall::is_write).collect()
    }

    /// Current habit rows of a user, newest first
    pub fn habits_of(&self, user: &UserId) -> Vec<Habit> {
        let tables = self.lock();
        tables
            .habits
            .get(user)
            .map(|rows| rows.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    // A poisoned lock only means a test panicked mid-call; the tables are still usable
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, then apply latency and injected failure
    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let (latency, failure) = {
            let mut tables = self.lock();
            tables.calls.push(call);
            (tables.latency, tables.failure.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HabitsRemote for MemoryRemote {
    async fn fetch_habits(&self, user: &UserId) -> Result<Vec<Habit>, RemoteError> {
        self.enter(RemoteCall::FetchHabits).await?;
        // Rows carry no local key; readers get fresh ones like from any remote
        Ok(self
            .habits_of(user)
            .into_iter()
            .map(|mut habit| {
                habit.key = HabitKey::new();
                habit
            })
            .collect())
    }

    async fn insert_habit(&self, user: &UserId, habit: &Habit) -> Result<RemoteId, RemoteError> {
        self.enter(RemoteCall::InsertHabit {
            title: habit.title.clone(),
        })
        .await?;
        let mut tables = self.lock();
        let id = tables.assign_id("habit");
        let mut row = habit.clone();
        row.id = Some(id.clone());
        tables.habits.entry(user.clone()).or_default().push(row);
        Ok(id)
    }

    async fn update_habit(&self, user: &UserId, id: &RemoteId, patch: &HabitPatch) -> Result<(), RemoteError> {
        self.enter(RemoteCall::UpdateHabit { id: id.clone() }).await?;
        let mut tables = self.lock();
        let row = tables
            .habits
            .get_mut(user)
            .and_then(|rows| rows.iter_mut().find(|h| h.id.as_ref() == Some(id)))
            .ok_or_else(|| RemoteError::NotFound(format!("habit {}", id)))?;
        patch.apply_to(row);
        Ok(())
    }

    async fn delete_habit(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::DeleteHabit { id: id.clone() }).await?;
        let mut tables = self.lock();
        let rows = tables.habits.entry(user.clone()).or_default();
        let before = rows.len();
        rows.retain(|h| h.id.as_ref() != Some(id));
        if rows.len() == before {
            return Err(RemoteError::NotFound(format!("habit {}", id)));
        }
        Ok(())
    }

    async fn replace_habits(&self, user: &UserId, habits: &[Habit]) -> Result<Vec<RemoteId>, RemoteError> {
        self.enter(RemoteCall::ReplaceHabits { count: habits.len() }).await?;
        let mut tables = self.lock();
        let mut rows = Vec::with_capacity(habits.len());
        let mut ids = Vec::with_capacity(habits.len());
        for habit in habits.iter().rev() {
            let id = tables.assign_id("habit");
            let mut row = habit.clone();
            row.id = Some(id.clone());
            rows.push(row);
            ids.push(id);
        }
        tables.habits.insert(user.clone(), rows);
        ids.reverse();
        Ok(ids)
    }
}

#[async_trait]
impl SettingsRemote for MemoryRemote {
    async fn fetch_settings(&self, user: &UserId) -> Result<Option<Settings>, RemoteError> {
        self.enter(RemoteCall::FetchSettings).await?;
        Ok(self.lock().settings.get(user).cloned())
    }

    async fn upsert_settings(&self, user: &UserId, settings: &Settings) -> Result<(), RemoteError> {
        self.enter(RemoteCall::UpsertSettings).await?;
        self.lock().settings.insert(user.clone(), settings.clone());
        Ok(())
    }
}

#[async_trait]
impl AchievementsRemote for MemoryRemote {
    async fn fetch_achievements(&self, user: &UserId) -> Result<Option<Vec<Achievement>>, RemoteError> {
        self.enter(RemoteCall::FetchAchievements).await?;
        Ok(self.lock().achievements.get(user).cloned())
    }

    async fn upsert_achievements(&self, user: &UserId, achievements: &[Achievement]) -> Result<(), RemoteError> {
        self.enter(RemoteCall::UpsertAchievements {
            count: achievements.len(),
        })
        .await?;
        self.lock().achievements.insert(user.clone(), achievements.to_vec());
        Ok(())
    }
}

#[async_trait]
impl DiaryRemote for MemoryRemote {
    async fn fetch_diary(&self, user: &UserId) -> Result<Vec<DiaryEntry>, RemoteError> {
        self.enter(RemoteCall::FetchDiary).await?;
        let mut entries = self.lock().diary.get(user).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn insert_diary_entry(&self, user: &UserId, entry: &DiaryEntry) -> Result<RemoteId, RemoteError> {
        self.enter(RemoteCall::InsertDiaryEntry).await?;
        let mut tables = self.lock();
        let id = tables.assign_id("diary");
        let mut row = entry.clone();
        row.id = Some(id.clone());
        tables.diary.entry(user.clone()).or_default().push(row);
        Ok(id)
    }

    async fn update_diary_entry(&self, user: &UserId, id: &RemoteId, text: &str) -> Result<(), RemoteError> {
        self.enter(RemoteCall::UpdateDiaryEntry { id: id.clone() }).await?;
        let mut tables = self.lock();
        let row = tables
            .diary
            .get_mut(user)
            .and_then(|rows| rows.iter_mut().find(|e| e.id.as_ref() == Some(id)))
            .ok_or_else(|| RemoteError::NotFound(format!("diary entry {}", id)))?;
        row.text = text.to_string();
        Ok(())
    }

    async fn delete_diary_entry(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::DeleteDiaryEntry { id: id.clone() }).await?;
        let mut tables = self.lock();
        let rows = tables.diary.entry(user.clone()).or_default();
        let before = rows.len();
        rows.retain(|e| e.id.as_ref() != Some(id));
        if rows.len() == before {
            return Err(RemoteError::NotFound(format!("diary entry {}", id)));
        }
        Ok(())
    }

    async fn replace_diary(&self, user: &UserId, entries: &[DiaryEntry]) -> Result<(), RemoteError> {
        self.enter(RemoteCall::ReplaceDiary { count: entries.len() }).await?;
        let mut tables = self.lock();
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut row = entry.clone();
            row.id = Some(tables.assign_id("diary"));
            rows.push(row);
        }
        tables.diary.insert(user.clone(), rows);
        Ok(())
    }
}
