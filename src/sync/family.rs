//! Entity families
//!
//! Binds each reducer to its local snapshot key and to the remote calls that
//! replicate its changes. The generic `Store` only talks to this trait.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Settings, UserId};
use crate::reducer::{
    AchievementsChange, AchievementsReducer, DiaryAction, DiaryChange, DiaryReducer, HabitAction, HabitChange,
    HabitsReducer, Reducer, SettingsChange, SettingsReducer,
};
use crate::storage::{
    AchievementsRemote, DiaryRemote, HabitsRemote, RemoteError, RemoteStore, SettingsRemote, ACHIEVEMENTS_KEY,
    HABITS_KEY, MAIN_DIARY_KEY, SETTINGS_KEY,
};

/// A reducer together with its persistence rules
#[async_trait]
pub trait EntityFamily: Reducer {
    /// Name used in logs and failure reports
    const NAME: &'static str;
    /// Key of the local snapshot
    const STORAGE_KEY: &'static str;

    /// State before anything was loaded or restored
    fn initial(&self) -> Self::State;

    /// Short description of a change for logs
    fn describe(&self, change: &Self::Change) -> String;

    /// Replicate one change
    ///
    /// May return a follow-up action to apply locally, e.g. recording the id
    /// the remote assigned to an inserted row.
    async fn push(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        change: Self::Change,
    ) -> Result<Option<Self::Action>, RemoteError>;

    /// Read the user's collection; `current` is kept where the remote has nothing
    async fn fetch(&self, remote: &dyn RemoteStore, user: &UserId, current: Self::State)
        -> Result<Self::State, RemoteError>;

    /// Replace the user's remote collection with `state`
    async fn overwrite(&self, remote: &dyn RemoteStore, user: &UserId, state: &Self::State) -> Result<(), RemoteError>;
}

#[async_trait]
impl EntityFamily for HabitsReducer {
    const NAME: &'static str = "habits";
    const STORAGE_KEY: &'static str = HABITS_KEY;

    fn initial(&self) -> Self::State {
        Vec::new()
    }

    fn describe(&self, change: &HabitChange) -> String {
        match change {
            HabitChange::Created(habit) => format!("insert '{}'", habit.title),
            HabitChange::Updated { key, id, .. } => match id {
                Some(id) => format!("update {}", id),
                None => format!("update {} (unsynced)", key),
            },
            HabitChange::Deleted { key, id } => match id {
                Some(id) => format!("delete {}", id),
                None => format!("delete {} (unsynced)", key),
            },
        }
    }

    async fn push(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        change: HabitChange,
    ) -> Result<Option<HabitAction>, RemoteError> {
        match change {
            HabitChange::Created(habit) => {
                let id = remote.insert_habit(user, &habit).await?;
                Ok(Some(HabitAction::AssignRemoteId {
                    key: habit.key,
                    id,
                    synced: Box::new(habit),
                }))
            }
            HabitChange::Updated { id: Some(id), patch, .. } => {
                remote.update_habit(user, &id, &patch).await?;
                Ok(None)
            }
            HabitChange::Deleted { id: Some(id), .. } => {
                remote.delete_habit(user, &id).await?;
                Ok(None)
            }
            // Insert still in flight; the id assignment catches up
            HabitChange::Updated { key, id: None, .. } | HabitChange::Deleted { key, id: None } => {
                debug!("Habit {} has no remote id yet, deferring", key);
                Ok(None)
            }
        }
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        current: Self::State,
    ) -> Result<Self::State, RemoteError> {
        let mut fetched = remote.fetch_habits(user).await?;
        // Rows already known locally keep their key
        for habit in &mut fetched {
            if let Some(known) = current.iter().find(|c| c.id.is_some() && c.id == habit.id) {
                habit.key = known.key;
            }
        }
        Ok(fetched)
    }

    async fn overwrite(&self, remote: &dyn RemoteStore, user: &UserId, state: &Self::State) -> Result<(), RemoteError> {
        remote.replace_habits(user, state).await.map(|_| ())
    }
}

#[async_trait]
impl EntityFamily for DiaryReducer {
    const NAME: &'static str = "mainDiary";
    const STORAGE_KEY: &'static str = MAIN_DIARY_KEY;

    fn initial(&self) -> Self::State {
        Vec::new()
    }

    fn describe(&self, change: &DiaryChange) -> String {
        match change {
            DiaryChange::Created(_) => "insert entry".to_string(),
            DiaryChange::Updated { id: Some(id), .. } => format!("update {}", id),
            DiaryChange::Deleted { id: Some(id) } => format!("delete {}", id),
            DiaryChange::Updated { id: None, .. } | DiaryChange::Deleted { id: None } => "unsynced entry".to_string(),
        }
    }

    async fn push(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        change: DiaryChange,
    ) -> Result<Option<DiaryAction>, RemoteError> {
        match change {
            DiaryChange::Created(entry) => {
                let id = remote.insert_diary_entry(user, &entry).await?;
                Ok(Some(DiaryAction::AssignRemoteId {
                    date: entry.date,
                    id,
                    synced_text: entry.text,
                }))
            }
            DiaryChange::Updated { id: Some(id), text } => {
                remote.update_diary_entry(user, &id, &text).await?;
                Ok(None)
            }
            DiaryChange::Deleted { id: Some(id) } => {
                remote.delete_diary_entry(user, &id).await?;
                Ok(None)
            }
            DiaryChange::Updated { id: None, .. } | DiaryChange::Deleted { id: None } => {
                debug!("Diary entry has no remote id yet, deferring");
                Ok(None)
            }
        }
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        _current: Self::State,
    ) -> Result<Self::State, RemoteError> {
        remote.fetch_diary(user).await
    }

    async fn overwrite(&self, remote: &dyn RemoteStore, user: &UserId, state: &Self::State) -> Result<(), RemoteError> {
        remote.replace_diary(user, state).await
    }
}

#[async_trait]
impl EntityFamily for SettingsReducer {
    const NAME: &'static str = "settings";
    const STORAGE_KEY: &'static str = SETTINGS_KEY;

    fn initial(&self) -> Settings {
        Settings::default()
    }

    fn describe(&self, _change: &SettingsChange) -> String {
        "upsert".to_string()
    }

    async fn push(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        change: SettingsChange,
    ) -> Result<Option<Self::Action>, RemoteError> {
        let SettingsChange::Upsert(settings) = change;
        remote.upsert_settings(user, &settings).await?;
        Ok(None)
    }

    async fn fetch(&self, remote: &dyn RemoteStore, user: &UserId, current: Settings) -> Result<Settings, RemoteError> {
        Ok(remote.fetch_settings(user).await?.unwrap_or(current))
    }

    async fn overwrite(&self, remote: &dyn RemoteStore, user: &UserId, state: &Settings) -> Result<(), RemoteError> {
        remote.upsert_settings(user, state).await
    }
}

#[async_trait]
impl EntityFamily for AchievementsReducer {
    const NAME: &'static str = "achievements";
    const STORAGE_KEY: &'static str = ACHIEVEMENTS_KEY;

    fn initial(&self) -> Self::State {
        Vec::new()
    }

    fn describe(&self, change: &AchievementsChange) -> String {
        let AchievementsChange::Upsert(list) = change;
        format!("upsert {} achievements", list.len())
    }

    async fn push(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        change: AchievementsChange,
    ) -> Result<Option<Self::Action>, RemoteError> {
        let AchievementsChange::Upsert(list) = change;
        remote.upsert_achievements(user, &list).await?;
        Ok(None)
    }

    async fn fetch(
        &self,
        remote: &dyn RemoteStore,
        user: &UserId,
        current: Self::State,
    ) -> Result<Self::State, RemoteError> {
        match remote.fetch_achievements(user).await? {
            Some(list) if !list.is_empty() => Ok(list),
            _ => Ok(current),
        }
    }

    async fn overwrite(&self, remote: &dyn RemoteStore, user: &UserId, state: &Self::State) -> Result<(), RemoteError> {
        remote.upsert_achievements(user, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Achievement, HabitDraft, HabitPatch, RemoteId, Theme};
    use crate::reducer::ReduceContext;
    use crate::storage::{MemoryRemote, RemoteCall};

    fn user() -> UserId {
        UserId::new("user-1")
    }

    #[tokio::test]
    async fn test_created_habit_yields_id_assignment() {
        let remote = MemoryRemote::new();
        let added = HabitsReducer::reduce(
            &Vec::new(),
            HabitAction::add(HabitDraft::new("Read", 1)),
            &ReduceContext::system(),
        )
        .unwrap();

        let follow_up = HabitsReducer
            .push(&remote, &user(), added.change.unwrap())
            .await
            .unwrap();

        match follow_up {
            Some(HabitAction::AssignRemoteId { key, id, .. }) => {
                assert_eq!(key, added.state[0].key);
                assert_eq!(remote.habits_of(&user())[0].id, Some(id));
            }
            other => panic!("unexpected follow-up {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsynced_changes_are_not_sent() {
        let remote = MemoryRemote::new();
        let change = HabitChange::Updated {
            key: crate::domain::HabitKey::new(),
            id: None,
            patch: HabitPatch::default(),
        };

        let follow_up = HabitsReducer.push(&remote, &user(), change).await.unwrap();
        assert!(follow_up.is_none());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_keeps_known_keys() {
        let remote = MemoryRemote::new();
        let mut habit = crate::domain::Habit::from_draft(
            HabitDraft::new("Read", 1),
            crate::domain::HabitKey::new(),
            crate::domain::now_millis(),
        );
        habit.id = Some(remote.insert_habit(&user(), &habit).await.unwrap());

        let fetched = HabitsReducer.fetch(&remote, &user(), vec![habit.clone()]).await.unwrap();
        assert_eq!(fetched[0].key, habit.key);

        let fresh = HabitsReducer.fetch(&remote, &user(), Vec::new()).await.unwrap();
        assert_ne!(fresh[0].key, habit.key);
    }

    #[tokio::test]
    async fn test_settings_kept_when_remote_has_none() {
        let remote = MemoryRemote::new();
        let mut current = Settings::default();
        current.theme = Theme::Dark;

        let fetched = SettingsReducer.fetch(&remote, &user(), current.clone()).await.unwrap();
        assert_eq!(fetched, current);
        assert_eq!(remote.calls(), vec![RemoteCall::FetchSettings]);
    }

    #[tokio::test]
    async fn test_achievements_kept_when_remote_list_empty() {
        let remote = MemoryRemote::new();
        remote.upsert_achievements(&user(), &[]).await.unwrap();
        let current = vec![Achievement::new("first", "First", crate::domain::now_millis())];

        let fetched = AchievementsReducer
            .fetch(&remote, &user(), current.clone())
            .await
            .unwrap();
        assert_eq!(fetched, current);
    }

    #[tokio::test]
    async fn test_diary_push_and_follow_up() {
        let remote = MemoryRemote::new();
        let added = DiaryReducer::reduce(
            &Vec::new(),
            DiaryAction::AddNote {
                date: crate::domain::now_millis(),
                text: "Hello".to_string(),
            },
            &ReduceContext::system(),
        )
        .unwrap();

        let follow_up = DiaryReducer
            .push(&remote, &user(), added.change.unwrap())
            .await
            .unwrap();
        assert!(matches!(
            follow_up,
            Some(DiaryAction::AssignRemoteId { ref id, .. }) if *id == RemoteId::new("diary-1")
        ));
    }
}
