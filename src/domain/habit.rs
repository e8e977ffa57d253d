//! Habit entity and related functionality
//!
//! This module defines the Habit struct that represents something a user
//! wants to do every day, the per-day progress record, and the validated
//! draft used to create or edit a habit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::streak::is_complete;
use crate::domain::types::{now_millis, timestamp};
use crate::domain::{DiaryEntry, DomainError, HabitKey, RemoteId};

/// Maximum title length accepted for a habit
pub const MAX_TITLE_LEN: usize = 100;

/// Progress recorded for a habit on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedDay {
    /// Calendar day in `YYYY-MM-DD` form
    pub date: NaiveDate,
    /// Number of completions logged that day
    pub progress: u32,
}

impl CompletedDay {
    pub fn new(date: NaiveDate, progress: u32) -> Self {
        Self { date, progress }
    }
}

/// A habit the user tracks by daily completion progress
///
/// `frequency` is the number of completions required per day. The habit is
/// owned by the habits store; the remote row is only a replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Stable local identity, used by every mutation
    #[serde(default)]
    pub key: HabitKey,
    /// Remote identity, `None` until the first successful insert
    #[serde(default)]
    pub id: Option<RemoteId>,
    pub title: String,
    #[serde(default)]
    pub color_index: u32,
    #[serde(default)]
    pub icon_title: String,
    /// Required completions per day (at least 1)
    pub frequency: u32,
    /// At most one entry per date, newest first
    #[serde(default)]
    pub completed_days: Vec<CompletedDay>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default = "now_millis", with = "timestamp")]
    pub creation_date: DateTime<Utc>,
    /// Notes attached to this habit
    #[serde(default)]
    pub diary: Vec<DiaryEntry>,
}

impl Habit {
    /// Create a new, never-synced habit from a validated draft
    pub fn from_draft(draft: HabitDraft, key: HabitKey, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            id: None,
            title: draft.title,
            color_index: draft.color_index,
            icon_title: draft.icon_title,
            frequency: draft.frequency,
            completed_days: Vec::new(),
            is_archived: false,
            creation_date: created_at,
            diary: Vec::new(),
        }
    }

    /// Progress record for a given day, if any
    pub fn day(&self, date: NaiveDate) -> Option<&CompletedDay> {
        self.completed_days.iter().find(|d| d.date == date)
    }

    /// Progress logged on a given day (0 when nothing was logged)
    pub fn progress_on(&self, date: NaiveDate) -> u32 {
        self.day(date).map(|d| d.progress).unwrap_or(0)
    }

    /// Whether the daily target was reached on a given day
    pub fn is_complete_on(&self, date: NaiveDate) -> bool {
        self.day(date)
            .map(|d| is_complete(d, self.frequency))
            .unwrap_or(false)
    }

    /// Whether this habit has been replicated to the remote store yet
    pub fn is_synced(&self) -> bool {
        self.id.is_some()
    }
}

/// User-supplied fields for creating or editing a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDraft {
    pub title: String,
    #[serde(default)]
    pub color_index: u32,
    #[serde(default)]
    pub icon_title: String,
    pub frequency: u32,
}

impl HabitDraft {
    pub fn new(title: impl Into<String>, frequency: u32) -> Self {
        Self {
            title: title.into().trim().to_string(),
            color_index: 0,
            icon_title: String::new(),
            frequency,
        }
    }

    pub fn with_color(mut self, color_index: u32) -> Self {
        self.color_index = color_index;
        self
    }

    pub fn with_icon(mut self, icon_title: impl Into<String>) -> Self {
        self.icon_title = icon_title.into();
        self
    }

    /// Build a draft from raw form values, rejecting a non-numeric frequency
    pub fn parse(title: &str, color_index: &str, icon_title: &str, frequency: &str) -> Result<Self, DomainError> {
        let frequency = frequency.trim().parse::<u32>().map_err(|_| {
            DomainError::InvalidFrequency(format!("Frequency must be a whole number, got '{}'", frequency))
        })?;
        let color_index = color_index.trim().parse::<u32>().map_err(|_| DomainError::Validation {
            message: format!("Color index must be a whole number, got '{}'", color_index),
        })?;

        Ok(Self {
            title: title.trim().to_string(),
            color_index,
            icon_title: icon_title.to_string(),
            frequency,
        })
    }

    /// Same draft with surrounding whitespace stripped from the title
    pub fn normalized(mut self) -> Self {
        let trimmed = self.title.trim();
        if trimmed.len() != self.title.len() {
            self.title = trimmed.to_string();
        }
        self
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), DomainError> {
        let trimmed = self.title.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName("Habit title cannot be empty".to_string()));
        }

        if trimmed.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::InvalidHabitName(format!(
                "Habit title cannot be longer than {} characters",
                MAX_TITLE_LEN
            )));
        }

        if self.frequency < 1 {
            return Err(DomainError::InvalidFrequency(
                "Frequency must be at least 1 completion per day".to_string(),
            ));
        }

        Ok(())
    }
}

/// Partial update sent to the remote store for a single habit
///
/// Only the fields that changed are set; the remote leaves the rest alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_days: Option<Vec<CompletedDay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diary: Option<Vec<DiaryEntry>>,
}

impl HabitPatch {
    /// Patch carrying the editable display fields of a habit
    pub fn details(habit: &Habit) -> Self {
        Self {
            title: Some(habit.title.clone()),
            color_index: Some(habit.color_index),
            icon_title: Some(habit.icon_title.clone()),
            frequency: Some(habit.frequency),
            ..Self::default()
        }
    }

    pub fn progress(habit: &Habit) -> Self {
        Self {
            completed_days: Some(habit.completed_days.clone()),
            ..Self::default()
        }
    }

    pub fn archived(habit: &Habit) -> Self {
        Self {
            is_archived: Some(habit.is_archived),
            ..Self::default()
        }
    }

    pub fn diary(habit: &Habit) -> Self {
        Self {
            diary: Some(habit.diary.clone()),
            ..Self::default()
        }
    }

    /// Apply this patch to a habit in place
    pub fn apply_to(&self, habit: &mut Habit) {
        if let Some(ref title) = self.title {
            habit.title = title.clone();
        }
        if let Some(color_index) = self.color_index {
            habit.color_index = color_index;
        }
        if let Some(ref icon_title) = self.icon_title {
            habit.icon_title = icon_title.clone();
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(ref completed_days) = self.completed_days {
            habit.completed_days = completed_days.clone();
        }
        if let Some(is_archived) = self.is_archived {
            habit.is_archived = is_archived;
        }
        if let Some(ref diary) = self.diary {
            habit.diary = diary.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        let draft = HabitDraft::new("Morning Run", 1).with_color(3).with_icon("run");
        assert!(draft.validate().is_ok());

        let habit = Habit::from_draft(draft, HabitKey::new(), now_millis());
        assert_eq!(habit.title, "Morning Run");
        assert!(!habit.is_archived);
        assert!(habit.diary.is_empty());
        assert!(!habit.is_synced());
    }

    #[test]
    fn test_invalid_drafts() {
        assert!(HabitDraft::new("   ", 1).validate().is_err());
        assert!(HabitDraft::new("Read", 0).validate().is_err());
        assert!(HabitDraft::new("x".repeat(MAX_TITLE_LEN + 1), 1).validate().is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_frequency() {
        let result = HabitDraft::parse("Read", "0", "book", "often");
        assert!(matches!(result, Err(DomainError::InvalidFrequency(_))));

        let draft = HabitDraft::parse(" Read ", "2", "book", " 3 ").unwrap();
        assert_eq!(draft.title, "Read");
        assert_eq!(draft.frequency, 3);
        assert_eq!(draft.color_index, 2);
    }

    #[test]
    fn test_deserialize_tolerates_missing_optional_fields() {
        let json = r#"{
            "title": "Stretch",
            "frequency": 2,
            "completedDays": [{"date": "2024-05-01", "progress": 2}],
            "creationDate": "2024-04-30T12:00:00Z"
        }"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.id, None);
        assert!(habit.is_complete_on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert!(!habit.is_archived);
    }
}
