//! Commands that change the habit collection

use serde::{Deserialize, Serialize};

use crate::domain::{compute_streaks, DomainError, Habit, HabitDraft, HabitKey};
use crate::reducer::HabitAction;
use crate::{AppError, HabitApp};

/// Find a habit by full key, key prefix (at least 4 characters) or exact title
///
/// Titles are matched among active habits first, then archived ones.
pub fn resolve_habit(habits: &[Habit], reference: &str) -> Result<HabitKey, DomainError> {
    let reference = reference.trim();

    if let Ok(key) = HabitKey::from_string(reference) {
        if habits.iter().any(|h| h.key == key) {
            return Ok(key);
        }
    }

    for archived in [false, true] {
        let titled: Vec<&Habit> = habits
            .iter()
            .filter(|h| h.is_archived == archived && h.title == reference)
            .collect();
        match titled.as_slice() {
            [habit] => return Ok(habit.key),
            [] => {}
            _ => return Err(DomainError::AmbiguousHabit(reference.to_string())),
        }
    }

    if reference.len() >= 4 {
        let prefixed: Vec<&Habit> = habits
            .iter()
            .filter(|h| h.key.to_string().starts_with(reference))
            .collect();
        match prefixed.as_slice() {
            [habit] => return Ok(habit.key),
            [] => {}
            _ => return Err(DomainError::AmbiguousHabit(reference.to_string())),
        }
    }

    Err(DomainError::UnknownHabit(reference.to_string()))
}

fn find<'a>(habits: &'a [Habit], key: HabitKey) -> Result<&'a Habit, DomainError> {
    habits
        .iter()
        .find(|h| h.key == key)
        .ok_or(DomainError::HabitNotFound(key))
}

/// Parameters for creating a new habit
#[derive(Debug, Deserialize)]
pub struct AddHabitParams {
    pub title: String,
    /// Completions per day, as typed by the user
    pub frequency: String,
    pub color_index: Option<String>,
    pub icon_title: Option<String>,
}

/// Parameters for editing a habit
#[derive(Debug, Deserialize)]
pub struct EditHabitParams {
    pub habit: String,
    pub title: Option<String>,
    pub frequency: Option<String>,
    pub color_index: Option<String>,
    pub icon_title: Option<String>,
    /// New position in the list, 0 being the top
    pub position: Option<usize>,
}

/// Response from any habit command
#[derive(Debug, Serialize)]
pub struct HabitResponse {
    pub success: bool,
    pub habit_key: Option<String>,
    pub message: String,
}

pub fn add_habit(app: &HabitApp, params: AddHabitParams) -> Result<HabitResponse, AppError> {
    let draft = HabitDraft::parse(
        &params.title,
        params.color_index.as_deref().unwrap_or("0"),
        params.icon_title.as_deref().unwrap_or(""),
        &params.frequency,
    )?;

    let key = HabitKey::new();
    app.stores().habits.dispatch(HabitAction::Add { key, draft })?;

    Ok(HabitResponse {
        success: true,
        habit_key: Some(key.to_string()),
        message: format!("Created habit '{}'! Ready to start your streak!", params.title.trim()),
    })
}

pub fn edit_habit(app: &HabitApp, params: EditHabitParams) -> Result<HabitResponse, AppError> {
    let habits = app.stores().habits.data();
    let key = resolve_habit(&habits, &params.habit)?;
    let current = find(&habits, key)?;

    let draft = HabitDraft::parse(
        params.title.as_deref().unwrap_or(&current.title),
        &params
            .color_index
            .unwrap_or_else(|| current.color_index.to_string()),
        params.icon_title.as_deref().unwrap_or(&current.icon_title),
        &params.frequency.unwrap_or_else(|| current.frequency.to_string()),
    )?;
    let title = draft.title.clone();

    app.stores().habits.dispatch(HabitAction::Edit {
        key,
        draft,
        position: params.position,
    })?;

    Ok(HabitResponse {
        success: true,
        habit_key: Some(key.to_string()),
        message: format!("Updated habit '{}'", title),
    })
}

/// Log one completion for today
pub fn log_progress(app: &HabitApp, habit: &str) -> Result<HabitResponse, AppError> {
    let store = &app.stores().habits;
    let key = resolve_habit(&store.data(), habit)?;
    store.dispatch(HabitAction::UpdateProgress { key })?;

    let habits = store.data();
    let habit = find(&habits, key)?;
    let today = chrono::Local::now().date_naive();
    let progress = habit.progress_on(today);
    let streak = compute_streaks(&habit.completed_days, habit.frequency).current_streak;

    let message = if habit.is_complete_on(today) {
        format!(
            "Completed '{}' for today ({}/{}). Current streak: {} day{}",
            habit.title,
            progress,
            habit.frequency,
            streak,
            if streak == 1 { "" } else { "s" }
        )
    } else {
        format!("Logged '{}': {}/{} today", habit.title, progress, habit.frequency)
    };

    Ok(HabitResponse {
        success: true,
        habit_key: Some(key.to_string()),
        message,
    })
}

/// Archive an active habit or restore an archived one
pub fn archive_habit(app: &HabitApp, habit: &str) -> Result<HabitResponse, AppError> {
    let store = &app.stores().habits;
    let key = resolve_habit(&store.data(), habit)?;
    store.dispatch(HabitAction::Archive { key })?;

    let habits = store.data();
    let habit = find(&habits, key)?;
    let message = if habit.is_archived {
        format!("Archived habit '{}'", habit.title)
    } else {
        format!("Restored habit '{}'", habit.title)
    };

    Ok(HabitResponse {
        success: true,
        habit_key: Some(key.to_string()),
        message,
    })
}

pub fn delete_habit(app: &HabitApp, habit: &str) -> Result<HabitResponse, AppError> {
    let store = &app.stores().habits;
    let habits = store.data();
    let key = resolve_habit(&habits, habit)?;
    let title = find(&habits, key)?.title.clone();
    store.dispatch(HabitAction::Delete { key })?;

    Ok(HabitResponse {
        success: true,
        habit_key: Some(key.to_string()),
        message: format!("Deleted habit '{}'", title),
    })
}
