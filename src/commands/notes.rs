//! Notes on a habit and the main diary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::resolve_habit;
use crate::domain::{canonical_timestamp, now_millis, parse_timestamp, DiaryEntry, DomainError};
use crate::reducer::{DiaryAction, HabitAction};
use crate::{AppError, HabitApp};

/// What to do with a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteOperation {
    Add,
    Edit,
    Delete,
}

/// Parameters for a note command
///
/// `habit` selects a habit's notes; without it the main diary is used.
#[derive(Debug, Deserialize)]
pub struct NoteParams {
    pub operation: NoteOperation,
    pub habit: Option<String>,
    /// Creation timestamp of the note; required to edit or delete
    pub date: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub success: bool,
    /// Canonical creation timestamp of the affected note
    pub date: String,
    pub message: String,
}

fn parse_date(date: Option<&str>) -> Result<DateTime<Utc>, DomainError> {
    let raw = date.ok_or_else(|| DomainError::Validation {
        message: "A note date is required".to_string(),
    })?;
    parse_timestamp(raw.trim()).map_err(|e| DomainError::Validation {
        message: format!("Invalid note date '{}': {}", raw, e),
    })
}

fn require_text(text: Option<String>) -> Result<String, DomainError> {
    text.ok_or_else(|| DomainError::Validation {
        message: "Note text is required".to_string(),
    })
}

pub fn apply_note(app: &HabitApp, params: NoteParams) -> Result<NoteResponse, AppError> {
    let date = match (params.operation, params.date.as_deref()) {
        (NoteOperation::Add, None) => now_millis(),
        (_, date) => parse_date(date)?,
    };

    let target = match &params.habit {
        Some(reference) => {
            let store = &app.stores().habits;
            let key = resolve_habit(&store.data(), reference)?;
            let action = match params.operation {
                NoteOperation::Add => HabitAction::AddNote {
                    key,
                    date,
                    text: require_text(params.text)?,
                },
                NoteOperation::Edit => HabitAction::EditNote {
                    key,
                    date,
                    text: require_text(params.text)?,
                },
                NoteOperation::Delete => HabitAction::DeleteNote { key, date },
            };
            store.dispatch(action)?;
            format!("habit '{}'", reference.trim())
        }
        None => {
            let action = match params.operation {
                NoteOperation::Add => DiaryAction::AddNote {
                    date,
                    text: require_text(params.text)?,
                },
                NoteOperation::Edit => DiaryAction::EditNote {
                    date,
                    text: require_text(params.text)?,
                },
                NoteOperation::Delete => DiaryAction::DeleteNote { date },
            };
            app.stores().diary.dispatch(action)?;
            "main diary".to_string()
        }
    };

    let verb = match params.operation {
        NoteOperation::Add => "Added",
        NoteOperation::Edit => "Updated",
        NoteOperation::Delete => "Deleted",
    };

    Ok(NoteResponse {
        success: true,
        date: canonical_timestamp(&date),
        message: format!("{} note in {}", verb, target),
    })
}

/// Notes of a habit, or the main diary, most recent first
pub fn list_notes(app: &HabitApp, habit: Option<&str>) -> Result<Vec<DiaryEntry>, AppError> {
    let mut notes = match habit {
        Some(reference) => {
            let habits = app.stores().habits.data();
            let key = resolve_habit(&habits, reference)?;
            habits
                .into_iter()
                .find(|h| h.key == key)
                .map(|h| h.diary)
                .unwrap_or_default()
        }
        None => app.stores().diary.data(),
    };
    notes.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(notes)
}
