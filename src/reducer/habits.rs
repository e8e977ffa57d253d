//! Habit collection reducer
//!
//! Every habit is addressed by its stable `HabitKey`, never by title.

use chrono::{DateTime, Utc};

use crate::domain::{
    canonical_timestamp, diary, CompletedDay, DiaryEntry, DomainError, Habit, HabitDraft, HabitKey,
    HabitPatch, RemoteId,
};
use crate::reducer::{ReduceContext, Reducer, Reduction};

/// Mutations of the habit collection
#[derive(Debug, Clone, PartialEq)]
pub enum HabitAction {
    /// Create a habit; the key is chosen by the caller so it can refer to it
    Add { key: HabitKey, draft: HabitDraft },
    /// Replace display fields, optionally moving the habit to `position`
    Edit {
        key: HabitKey,
        draft: HabitDraft,
        position: Option<usize>,
    },
    Delete { key: HabitKey },
    /// Toggle the archived flag
    Archive { key: HabitKey },
    /// Log one completion for today
    UpdateProgress { key: HabitKey },
    AddNote {
        key: HabitKey,
        date: DateTime<Utc>,
        text: String,
    },
    EditNote {
        key: HabitKey,
        date: DateTime<Utc>,
        text: String,
    },
    DeleteNote { key: HabitKey, date: DateTime<Utc> },
    /// Record the id the remote assigned to an inserted habit
    ///
    /// `synced` is the habit as it was inserted, so changes made while the
    /// insert was in flight can be pushed once the id is known.
    AssignRemoteId {
        key: HabitKey,
        id: RemoteId,
        synced: Box<Habit>,
    },
}

impl HabitAction {
    /// Build an add action with a freshly generated key
    pub fn add(draft: HabitDraft) -> Self {
        HabitAction::Add {
            key: HabitKey::new(),
            draft,
        }
    }
}

/// Single-habit change to replicate
#[derive(Debug, Clone, PartialEq)]
pub enum HabitChange {
    Created(Habit),
    Updated {
        key: HabitKey,
        id: Option<RemoteId>,
        patch: HabitPatch,
    },
    Deleted { key: HabitKey, id: Option<RemoteId> },
}

pub struct HabitsReducer;

impl Reducer for HabitsReducer {
    type State = Vec<Habit>;
    type Action = HabitAction;
    type Change = HabitChange;

    fn reduce(
        habits: &Vec<Habit>,
        action: HabitAction,
        ctx: &ReduceContext,
    ) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
        match action {
            HabitAction::Add { key, draft } => add(habits, key, draft, ctx),
            HabitAction::Edit { key, draft, position } => edit(habits, key, draft, position),
            HabitAction::Delete { key } => delete(habits, key),
            HabitAction::Archive { key } => archive(habits, key),
            HabitAction::UpdateProgress { key } => update_progress(habits, key, ctx),
            HabitAction::AddNote { key, date, text } => add_note(habits, key, date, text),
            HabitAction::EditNote { key, date, text } => edit_note(habits, key, date, text),
            HabitAction::DeleteNote { key, date } => delete_note(habits, key, date),
            HabitAction::AssignRemoteId { key, id, synced } => assign_remote_id(habits, key, id, *synced),
        }
    }
}

fn position_of(habits: &[Habit], key: HabitKey) -> Result<usize, DomainError> {
    habits
        .iter()
        .position(|h| h.key == key)
        .ok_or(DomainError::HabitNotFound(key))
}

/// Reject a title already used by another active habit
fn ensure_title_free(habits: &[Habit], title: &str, except: Option<HabitKey>) -> Result<(), DomainError> {
    let taken = habits
        .iter()
        .any(|h| !h.is_archived && h.title.trim() == title && Some(h.key) != except);
    if taken {
        return Err(DomainError::DuplicateTitle(title.to_string()));
    }
    Ok(())
}

fn updated(habits: Vec<Habit>, index: usize, patch: HabitPatch) -> Reduction<Vec<Habit>, HabitChange> {
    let habit = &habits[index];
    let change = HabitChange::Updated {
        key: habit.key,
        id: habit.id.clone(),
        patch,
    };
    Reduction::changed(habits, change)
}

fn add(
    habits: &[Habit],
    key: HabitKey,
    draft: HabitDraft,
    ctx: &ReduceContext,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let draft = draft.normalized();
    draft.validate()?;
    ensure_title_free(habits, &draft.title, None)?;
    if habits.iter().any(|h| h.key == key) {
        return Err(DomainError::Validation {
            message: format!("Habit key {} is already in use", key),
        });
    }

    let habit = Habit::from_draft(draft, key, ctx.now);

    // Most recent first
    let mut next = Vec::with_capacity(habits.len() + 1);
    next.push(habit.clone());
    next.extend_from_slice(habits);

    Ok(Reduction::changed(next, HabitChange::Created(habit)))
}

fn edit(
    habits: &[Habit],
    key: HabitKey,
    draft: HabitDraft,
    position: Option<usize>,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    let draft = draft.normalized();
    draft.validate()?;
    if !habits[index].is_archived {
        ensure_title_free(habits, &draft.title, Some(key))?;
    }

    let mut next = habits.to_vec();
    let mut habit = next.remove(index);
    habit.title = draft.title;
    habit.color_index = draft.color_index;
    habit.icon_title = draft.icon_title;
    habit.frequency = draft.frequency;

    let target = position.unwrap_or(index).min(next.len());
    next.insert(target, habit);

    let patch = HabitPatch::details(&next[target]);
    Ok(updated(next, target, patch))
}

fn delete(habits: &[Habit], key: HabitKey) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    let mut next = habits.to_vec();
    let removed = next.remove(index);
    Ok(Reduction::changed(
        next,
        HabitChange::Deleted {
            key,
            id: removed.id,
        },
    ))
}

fn archive(habits: &[Habit], key: HabitKey) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    // Restoring from the archive must not create a duplicate active title
    if habits[index].is_archived {
        ensure_title_free(habits, &habits[index].title, Some(key))?;
    }

    let mut next = habits.to_vec();
    next[index].is_archived = !next[index].is_archived;
    let patch = HabitPatch::archived(&next[index]);
    Ok(updated(next, index, patch))
}

fn update_progress(
    habits: &[Habit],
    key: HabitKey,
    ctx: &ReduceContext,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;

    // Progress stops at the daily target
    if habits[index].is_complete_on(ctx.today) {
        return Ok(Reduction::unchanged(habits.to_vec()));
    }

    let mut next = habits.to_vec();
    let habit = &mut next[index];
    match habit.completed_days.iter_mut().find(|d| d.date == ctx.today) {
        Some(day) => day.progress += 1,
        None => habit.completed_days.insert(0, CompletedDay::new(ctx.today, 1)),
    }

    let patch = HabitPatch::progress(&next[index]);
    Ok(updated(next, index, patch))
}

fn add_note(
    habits: &[Habit],
    key: HabitKey,
    date: DateTime<Utc>,
    text: String,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    if habits[index].diary.iter().any(|n| n.created_at(&date)) {
        return Err(DomainError::Validation {
            message: format!("A note created at {} already exists", canonical_timestamp(&date)),
        });
    }
    let note = DiaryEntry::new(date, text)?;

    let mut next = habits.to_vec();
    next[index].diary.push(note);
    let patch = HabitPatch::diary(&next[index]);
    Ok(updated(next, index, patch))
}

fn edit_note(
    habits: &[Habit],
    key: HabitKey,
    date: DateTime<Utc>,
    text: String,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    diary::validate_text(&text)?;

    let mut next = habits.to_vec();
    let note = next[index]
        .diary
        .iter_mut()
        .find(|n| n.created_at(&date))
        .ok_or_else(|| DomainError::NoteNotFound(canonical_timestamp(&date)))?;
    note.text = text;

    let patch = HabitPatch::diary(&next[index]);
    Ok(updated(next, index, patch))
}

fn delete_note(
    habits: &[Habit],
    key: HabitKey,
    date: DateTime<Utc>,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let index = position_of(habits, key)?;
    let note_index = habits[index]
        .diary
        .iter()
        .position(|n| n.created_at(&date))
        .ok_or_else(|| DomainError::NoteNotFound(canonical_timestamp(&date)))?;

    let mut next = habits.to_vec();
    next[index].diary.remove(note_index);
    let patch = HabitPatch::diary(&next[index]);
    Ok(updated(next, index, patch))
}

fn assign_remote_id(
    habits: &[Habit],
    key: HabitKey,
    id: RemoteId,
    synced: Habit,
) -> Result<Reduction<Vec<Habit>, HabitChange>, DomainError> {
    let Some(index) = habits.iter().position(|h| h.key == key) else {
        // Deleted locally before the insert came back: remove the orphan row
        return Ok(Reduction::changed(
            habits.to_vec(),
            HabitChange::Deleted { key, id: Some(id) },
        ));
    };

    let mut next = habits.to_vec();
    next[index].id = Some(id.clone());

    let mut inserted = synced;
    inserted.id = Some(id);
    if next[index] == inserted {
        return Ok(Reduction::unchanged(next));
    }

    // Mutations made while the insert was in flight were never sent
    let habit = &next[index];
    let patch = HabitPatch {
        title: Some(habit.title.clone()),
        color_index: Some(habit.color_index),
        icon_title: Some(habit.icon_title.clone()),
        frequency: Some(habit.frequency),
        completed_days: Some(habit.completed_days.clone()),
        is_archived: Some(habit.is_archived),
        diary: Some(habit.diary.clone()),
    };
    Ok(updated(next, index, patch))
}
