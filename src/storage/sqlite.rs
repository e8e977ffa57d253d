//! SQLite implementation of the remote table store
//!
//! Stands in for the hosted relational backend: the same four tables, every
//! row scoped by `user_id`, nested arrays kept as JSON columns. The CLI points
//! it at a file shared between "devices".

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::domain::{
    canonical_timestamp, parse_timestamp, Achievement, DiaryEntry, Habit, HabitKey, HabitPatch, RemoteId,
    Settings, UserId,
};
use crate::storage::{
    migrations, AchievementsRemote, DiaryRemote, HabitsRemote, RemoteError, SettingsRemote,
};

const HABIT_COLUMNS: &str =
    "id, title, color_index, icon_title, frequency, completed_days, is_archived, creation_date, diary";

/// SQLite-based remote store
pub struct SqliteRemote {
    conn: Mutex<Connection>,
}

impl SqliteRemote {
    /// Open the database file and run any necessary migrations
    pub fn new(db_path: PathBuf) -> Result<Self, RemoteError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| RemoteError::Unavailable(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite remote store initialized at: {:?}", db_path);

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self, RemoteError> {
        let conn = Connection::open_in_memory()?;
        migrations::initialize_database(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RemoteError> {
        self.conn
            .lock()
            .map_err(|_| RemoteError::Unavailable("connection lock poisoned".to_string()))
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Map a `habits` row (selected with `HABIT_COLUMNS`) to a habit
    fn row_to_habit(row: &Row<'_>) -> Result<Habit, rusqlite::Error> {
        let completed_json: String = row.get(5)?;
        let completed_days = serde_json::from_str(&completed_json).map_err(|_| {
            rusqlite::Error::InvalidColumnType(5, "Invalid completed_days".to_string(), rusqlite::types::Type::Text)
        })?;

        let creation_str: String = row.get(7)?;
        let creation_date = parse_timestamp(&creation_str).map_err(|_| {
            rusqlite::Error::InvalidColumnType(7, "Invalid datetime".to_string(), rusqlite::types::Type::Text)
        })?;

        let diary_json: String = row.get(8)?;
        let diary = serde_json::from_str(&diary_json).map_err(|_| {
            rusqlite::Error::InvalidColumnType(8, "Invalid diary".to_string(), rusqlite::types::Type::Text)
        })?;

        Ok(Habit {
            key: HabitKey::new(),
            id: Some(RemoteId::new(row.get::<_, String>(0)?)),
            title: row.get(1)?,
            color_index: row.get(2)?,
            icon_title: row.get(3)?,
            frequency: row.get(4)?,
            completed_days,
            is_archived: row.get(6)?,
            creation_date,
            diary,
        })
    }

    fn insert_habit_row(conn: &Connection, user: &UserId, habit: &Habit) -> Result<RemoteId, RemoteError> {
        let id = Self::new_id();
        conn.execute(
            "INSERT INTO habits (
                id, user_id, title, color_index, icon_title, frequency,
                completed_days, is_archived, creation_date, diary, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id,
                user.as_str(),
                habit.title,
                habit.color_index,
                habit.icon_title,
                habit.frequency,
                serde_json::to_string(&habit.completed_days)?,
                habit.is_archived,
                canonical_timestamp(&habit.creation_date),
                serde_json::to_string(&habit.diary)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(RemoteId::new(id))
    }

    fn insert_diary_row(conn: &Connection, user: &UserId, entry: &DiaryEntry) -> Result<RemoteId, RemoteError> {
        let id = Self::new_id();
        conn.execute(
            "INSERT INTO main_diary (id, user_id, date, text) VALUES (?1, ?2, ?3, ?4)",
            params![id, user.as_str(), canonical_timestamp(&entry.date), entry.text],
        )?;
        Ok(RemoteId::new(id))
    }
}

#[async_trait]
impl HabitsRemote for SqliteRemote {
    async fn fetch_habits(&self, user: &UserId) -> Result<Vec<Habit>, RemoteError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM habits WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            HABIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let habit_iter = stmt.query_map(params![user.as_str()], Self::row_to_habit)?;

        let mut habits = Vec::new();
        for habit in habit_iter {
            habits.push(habit?);
        }

        tracing::debug!("Fetched {} habits for user {}", habits.len(), user);
        Ok(habits)
    }

    async fn insert_habit(&self, user: &UserId, habit: &Habit) -> Result<RemoteId, RemoteError> {
        let conn = self.conn()?;
        let id = Self::insert_habit_row(&conn, user, habit)?;
        tracing::debug!("Inserted habit: {} ({})", habit.title, id);
        Ok(id)
    }

    async fn update_habit(&self, user: &UserId, id: &RemoteId, patch: &HabitPatch) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM habits WHERE id = ?1 AND user_id = ?2", HABIT_COLUMNS);
        let mut habit = conn
            .query_row(&sql, params![id.as_str(), user.as_str()], Self::row_to_habit)
            .optional()?
            .ok_or_else(|| RemoteError::NotFound(format!("habit {}", id)))?;

        patch.apply_to(&mut habit);

        conn.execute(
            "UPDATE habits SET
                title = ?3,
                color_index = ?4,
                icon_title = ?5,
                frequency = ?6,
                completed_days = ?7,
                is_archived = ?8,
                diary = ?9,
                updated_at = ?10
             WHERE id = ?1 AND user_id = ?2",
            params![
                id.as_str(),
                user.as_str(),
                habit.title,
                habit.color_index,
                habit.icon_title,
                habit.frequency,
                serde_json::to_string(&habit.completed_days)?,
                habit.is_archived,
                serde_json::to_string(&habit.diary)?,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tracing::debug!("Updated habit: {} ({})", habit.title, id);
        Ok(())
    }

    async fn delete_habit(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
            params![id.as_str(), user.as_str()],
        )?;

        if rows_affected == 0 {
            return Err(RemoteError::NotFound(format!("habit {}", id)));
        }

        tracing::debug!("Deleted habit: {}", id);
        Ok(())
    }

    async fn replace_habits(&self, user: &UserId, habits: &[Habit]) -> Result<Vec<RemoteId>, RemoteError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM habits WHERE user_id = ?1", params![user.as_str()])?;

        // Reads are newest-row-first, so insert back to front
        let mut ids = Vec::with_capacity(habits.len());
        for habit in habits.iter().rev() {
            ids.push(Self::insert_habit_row(&tx, user, habit)?);
        }
        tx.commit()?;
        ids.reverse();

        tracing::debug!("Replaced habits for user {} ({} rows)", user, ids.len());
        Ok(ids)
    }
}

#[async_trait]
impl SettingsRemote for SqliteRemote {
    async fn fetch_settings(&self, user: &UserId) -> Result<Option<Settings>, RemoteError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT settings FROM user_settings WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert_settings(&self, user: &UserId, settings: &Settings) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO user_settings (user_id, settings, updated_at) VALUES (?1, ?2, ?3)",
            params![user.as_str(), serde_json::to_string(settings)?, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!("Upserted settings for user {}", user);
        Ok(())
    }
}

#[async_trait]
impl AchievementsRemote for SqliteRemote {
    async fn fetch_achievements(&self, user: &UserId) -> Result<Option<Vec<Achievement>>, RemoteError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT achievements FROM user_achievements WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert_achievements(&self, user: &UserId, achievements: &[Achievement]) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO user_achievements (user_id, achievements, updated_at) VALUES (?1, ?2, ?3)",
            params![
                user.as_str(),
                serde_json::to_string(achievements)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        tracing::debug!("Upserted {} achievements for user {}", achievements.len(), user);
        Ok(())
    }
}

#[async_trait]
impl DiaryRemote for SqliteRemote {
    async fn fetch_diary(&self, user: &UserId) -> Result<Vec<DiaryEntry>, RemoteError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, text FROM main_diary WHERE user_id = ?1 ORDER BY date DESC",
        )?;

        let entry_iter = stmt.query_map(params![user.as_str()], |row| {
            let date_str: String = row.get(1)?;
            let date = parse_timestamp(&date_str).map_err(|_| {
                rusqlite::Error::InvalidColumnType(1, "Invalid datetime".to_string(), rusqlite::types::Type::Text)
            })?;

            Ok(DiaryEntry {
                id: Some(RemoteId::new(row.get::<_, String>(0)?)),
                date,
                text: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }

    async fn insert_diary_entry(&self, user: &UserId, entry: &DiaryEntry) -> Result<RemoteId, RemoteError> {
        let conn = self.conn()?;
        let id = Self::insert_diary_row(&conn, user, entry)?;
        tracing::debug!("Inserted diary entry {}", id);
        Ok(id)
    }

    async fn update_diary_entry(&self, user: &UserId, id: &RemoteId, text: &str) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE main_diary SET text = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![id.as_str(), user.as_str(), text, Utc::now().to_rfc3339()],
        )?;

        if rows_affected == 0 {
            return Err(RemoteError::NotFound(format!("diary entry {}", id)));
        }
        Ok(())
    }

    async fn delete_diary_entry(&self, user: &UserId, id: &RemoteId) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM main_diary WHERE id = ?1 AND user_id = ?2",
            params![id.as_str(), user.as_str()],
        )?;

        if rows_affected == 0 {
            return Err(RemoteError::NotFound(format!("diary entry {}", id)));
        }
        Ok(())
    }

    async fn replace_diary(&self, user: &UserId, entries: &[DiaryEntry]) -> Result<(), RemoteError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM main_diary WHERE user_id = ?1", params![user.as_str()])?;
        for entry in entries {
            Self::insert_diary_row(&tx, user, entry)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{now_millis, CompletedDay, HabitDraft, Theme};
    use chrono::NaiveDate;
    use tokio_test::block_on;

    fn habit(title: &str) -> Habit {
        Habit::from_draft(HabitDraft::new(title, 2), HabitKey::new(), now_millis())
    }

    #[test]
    fn test_habit_crud_is_user_scoped() {
        let remote = SqliteRemote::in_memory().unwrap();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let id = block_on(remote.insert_habit(&alice, &habit("Read"))).unwrap();
        block_on(remote.insert_habit(&bob, &habit("Walk"))).unwrap();

        let patch = HabitPatch {
            completed_days: Some(vec![CompletedDay::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 2)]),
            ..HabitPatch::default()
        };
        block_on(remote.update_habit(&alice, &id, &patch)).unwrap();

        let habits = block_on(remote.fetch_habits(&alice)).unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, Some(id.clone()));
        assert_eq!(habits[0].title, "Read");
        assert_eq!(habits[0].completed_days.len(), 1);

        // Bob can't touch Alice's row
        assert!(block_on(remote.delete_habit(&bob, &id)).is_err());
        block_on(remote.delete_habit(&alice, &id)).unwrap();
        assert!(block_on(remote.fetch_habits(&alice)).unwrap().is_empty());
    }

    #[test]
    fn test_replace_habits_keeps_order() {
        let remote = SqliteRemote::in_memory().unwrap();
        let user = UserId::new("alice");
        block_on(remote.insert_habit(&user, &habit("Old"))).unwrap();

        let ids = block_on(remote.replace_habits(&user, &[habit("A"), habit("B"), habit("C")])).unwrap();
        assert_eq!(ids.len(), 3);

        let titles: Vec<String> = block_on(remote.fetch_habits(&user))
            .unwrap()
            .into_iter()
            .map(|h| h.title)
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_settings_and_achievements_upsert() {
        let remote = SqliteRemote::in_memory().unwrap();
        let user = UserId::new("alice");
        assert_eq!(block_on(remote.fetch_settings(&user)).unwrap(), None);

        let settings = Settings {
            theme: Theme::Dark,
            ..Settings::default()
        };
        block_on(remote.upsert_settings(&user, &settings)).unwrap();
        block_on(remote.upsert_settings(&user, &settings)).unwrap();
        assert_eq!(block_on(remote.fetch_settings(&user)).unwrap(), Some(settings));

        let unlocked = vec![Achievement::new("streak-7", "Week streak", now_millis())];
        block_on(remote.upsert_achievements(&user, &unlocked)).unwrap();
        assert_eq!(block_on(remote.fetch_achievements(&user)).unwrap(), Some(unlocked));
    }

    #[test]
    fn test_diary_rows() {
        let remote = SqliteRemote::in_memory().unwrap();
        let user = UserId::new("alice");
        let early = DiaryEntry::new(parse_timestamp("2024-06-01T08:00:00Z").unwrap(), "early").unwrap();
        let late = DiaryEntry::new(parse_timestamp("2024-06-02T08:00:00Z").unwrap(), "late").unwrap();

        let id = block_on(remote.insert_diary_entry(&user, &early)).unwrap();
        block_on(remote.insert_diary_entry(&user, &late)).unwrap();
        block_on(remote.update_diary_entry(&user, &id, "earlier")).unwrap();

        let entries = block_on(remote.fetch_diary(&user)).unwrap();
        assert_eq!(entries[0].text, "late");
        assert_eq!(entries[1].text, "earlier");
        assert_eq!(entries[1].date, early.date);

        block_on(remote.replace_diary(&user, &[early])).unwrap();
        assert_eq!(block_on(remote.fetch_diary(&user)).unwrap().len(), 1);
    }
}
