//! Domain module containing core entities and pure logic
//!
//! This module defines the entities (Habit, DiaryEntry, Settings,
//! Achievement), their validation rules, and the streak utilities. Nothing in
//! here performs I/O.

pub mod achievement;
pub mod diary;
pub mod habit;
pub mod settings;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use achievement::*;
pub use diary::*;
pub use habit::*;
pub use settings::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
///
/// Returned by reducers when an action is rejected; the prior state is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("An active habit titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("Habit not found: {0}")]
    HabitNotFound(HabitKey),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("No habit matches '{0}'")]
    UnknownHabit(String),

    #[error("'{0}' matches more than one habit")]
    AmbiguousHabit(String),
}
