//! Diary entries, used both for per-habit notes and the main diary
//!
//! Entries are addressed by their creation timestamp. Timestamps are parsed
//! into `DateTime<Utc>` at the boundary and written back in one canonical
//! form, so two spellings of the same instant always match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::timestamp;
use crate::domain::{DomainError, RemoteId};

/// Maximum diary text length
pub const MAX_NOTE_LEN: usize = 10_000;

/// A dated piece of free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Remote identity, `None` until synced (per-habit notes never get one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    /// Creation timestamp, also the lookup key
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub text: String,
}

impl DiaryEntry {
    /// Create a new unsynced entry with validation
    pub fn new(date: DateTime<Utc>, text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        validate_text(&text)?;
        Ok(Self { id: None, date, text })
    }

    /// Whether this entry was created at the given instant
    pub fn created_at(&self, date: &DateTime<Utc>) -> bool {
        self.date == *date
    }
}

/// Validate note text
pub fn validate_text(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "Note text cannot be empty".to_string(),
        });
    }

    if text.chars().count() > MAX_NOTE_LEN {
        return Err(DomainError::Validation {
            message: format!("Note text cannot be longer than {} characters", MAX_NOTE_LEN),
        });
    }

    Ok(())
}
