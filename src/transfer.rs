//! Bulk export and import
//!
//! An export is a detached copy of all four collections. An import replaces
//! each collection it carries wholesale; when a user is signed in the new
//! collections are pushed to the remote first and then reloaded from it, so
//! local state ends up matching what the remote accepted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{now_millis, timestamp, Achievement, DiaryEntry, DomainError, Habit, HabitDraft, Settings};
use crate::storage::RemoteError;
use crate::sync::StoreSet;

/// Errors that can occur while exporting or importing
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid import file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid habit '{title}' in import file: {source}")]
    InvalidHabit {
        title: String,
        #[source]
        source: DomainError,
    },

    #[error("Remote store rejected the {family} import: {source}")]
    Remote {
        family: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("Import was stored remotely but reloading failed: {0}")]
    Reload(#[source] RemoteError),
}

/// Everything a user owns, as written to an export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub habits: Vec<Habit>,
    pub settings: Settings,
    pub achievements: Vec<Achievement>,
    pub main_diary: Vec<DiaryEntry>,
    #[serde(with = "timestamp")]
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    /// Copy the current contents of every store
    pub fn capture(stores: &StoreSet) -> Self {
        Self {
            habits: stores.habits.data(),
            settings: stores.settings.data(),
            achievements: stores.achievements.data(),
            main_diary: stores.diary.data(),
            export_date: now_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// An import file; any top-level key may be missing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub habits: Option<Vec<Habit>>,
    pub settings: Option<Settings>,
    pub achievements: Option<Vec<Achievement>>,
    pub main_diary: Option<Vec<DiaryEntry>>,
    /// Kept as given; not needed to apply the import
    pub export_date: Option<String>,
}

impl ImportDocument {
    pub fn parse(json: &str) -> Result<Self, TransferError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the document carries no collection at all
    pub fn is_empty(&self) -> bool {
        self.habits.is_none() && self.settings.is_none() && self.achievements.is_none() && self.main_diary.is_none()
    }
}

impl From<ExportDocument> for ImportDocument {
    fn from(doc: ExportDocument) -> Self {
        Self {
            habits: Some(doc.habits),
            settings: Some(doc.settings),
            achievements: Some(doc.achievements),
            main_diary: Some(doc.main_diary),
            export_date: Some(crate::domain::canonical_timestamp(&doc.export_date)),
        }
    }
}

/// What an import changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub habits: Option<usize>,
    pub settings: bool,
    pub achievements: Option<usize>,
    pub main_diary: Option<usize>,
    /// Whether the collections were pushed to and reloaded from the remote
    pub synced: bool,
}

impl ImportSummary {
    fn of(doc: &ImportDocument) -> Self {
        Self {
            habits: doc.habits.as_ref().map(Vec::len),
            settings: doc.settings.is_some(),
            achievements: doc.achievements.as_ref().map(Vec::len),
            main_diary: doc.main_diary.as_ref().map(Vec::len),
            synced: false,
        }
    }
}

/// Replace the collections carried by `doc`
///
/// Offline, the local collections are replaced and snapshotted. Online, each
/// collection is overwritten remotely first; a rejection aborts the import
/// before any local change (collections already pushed stay pushed). After
/// the remote accepted everything, the local collections are replaced and
/// all stores are reloaded.
pub async fn import(stores: &StoreSet, doc: ImportDocument) -> Result<ImportSummary, TransferError> {
    let mut summary = ImportSummary::of(&doc);
    if doc.is_empty() {
        info!("Import file carries no collections");
        return Ok(summary);
    }
    if let Some(habits) = &doc.habits {
        validate_habits(habits)?;
    }

    let Some(user) = stores.habits.user_id() else {
        apply_locally(stores, doc);
        info!("Imported into local storage only");
        return Ok(summary);
    };

    // Earlier per-item writes must not land on top of the overwrite
    stores.wait_idle().await;

    info!("Importing for user {}", user);
    if let Some(habits) = &doc.habits {
        push(stores.habits.overwrite_remote(&user, habits).await, "habits")?;
    }
    if let Some(settings) = &doc.settings {
        push(stores.settings.overwrite_remote(&user, settings).await, "settings")?;
    }
    if let Some(achievements) = &doc.achievements {
        push(stores.achievements.overwrite_remote(&user, achievements).await, "achievements")?;
    }
    if let Some(entries) = &doc.main_diary {
        push(stores.diary.overwrite_remote(&user, entries).await, "mainDiary")?;
    }

    apply_locally(stores, doc);
    stores.reload_all(&user).await.map_err(TransferError::Reload)?;

    summary.synced = true;
    info!("Import complete, stores reloaded");
    Ok(summary)
}

/// Imported habits obey the same rules as added ones
fn validate_habits(habits: &[Habit]) -> Result<(), TransferError> {
    let mut active = HashSet::new();
    for habit in habits {
        let invalid = |source: DomainError| TransferError::InvalidHabit {
            title: habit.title.clone(),
            source,
        };
        HabitDraft::new(habit.title.as_str(), habit.frequency)
            .validate()
            .map_err(&invalid)?;

        let title = habit.title.trim();
        if !habit.is_archived && !active.insert(title) {
            return Err(invalid(DomainError::DuplicateTitle(title.to_string())));
        }
    }
    Ok(())
}

fn push(result: Result<(), RemoteError>, family: &'static str) -> Result<(), TransferError> {
    result.map_err(|source| {
        warn!("Import of {} rejected: {}", family, source);
        TransferError::Remote { family, source }
    })
}

fn apply_locally(stores: &StoreSet, doc: ImportDocument) {
    if let Some(habits) = doc.habits {
        stores.habits.replace(habits);
    }
    if let Some(settings) = doc.settings {
        stores.settings.replace(settings);
    }
    if let Some(achievements) = doc.achievements {
        stores.achievements.replace(achievements);
    }
    if let Some(entries) = doc.main_diary {
        stores.diary.replace(entries);
    }
}
