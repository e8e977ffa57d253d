//! Main diary reducer
//!
//! Entries are located by creation timestamp. The parsed `DateTime<Utc>`
//! compares instants, so differently formatted spellings of the same moment
//! still match.

use chrono::{DateTime, Utc};

use crate::domain::{canonical_timestamp, diary, DiaryEntry, DomainError, RemoteId};
use crate::reducer::{ReduceContext, Reducer, Reduction};

/// Mutations of the main diary
#[derive(Debug, Clone, PartialEq)]
pub enum DiaryAction {
    AddNote { date: DateTime<Utc>, text: String },
    EditNote { date: DateTime<Utc>, text: String },
    DeleteNote { date: DateTime<Utc> },
    /// Record the id the remote assigned to an inserted entry
    AssignRemoteId {
        date: DateTime<Utc>,
        id: RemoteId,
        /// Text as it was inserted
        synced_text: String,
    },
}

/// Single-entry change to replicate
#[derive(Debug, Clone, PartialEq)]
pub enum DiaryChange {
    Created(DiaryEntry),
    Updated { id: Option<RemoteId>, text: String },
    Deleted { id: Option<RemoteId> },
}

pub struct DiaryReducer;

impl Reducer for DiaryReducer {
    type State = Vec<DiaryEntry>;
    type Action = DiaryAction;
    type Change = DiaryChange;

    fn reduce(
        entries: &Vec<DiaryEntry>,
        action: DiaryAction,
        _ctx: &ReduceContext,
    ) -> Result<Reduction<Vec<DiaryEntry>, DiaryChange>, DomainError> {
        let find = |date: &DateTime<Utc>| {
            entries
                .iter()
                .position(|e| e.created_at(date))
                .ok_or_else(|| DomainError::NoteNotFound(canonical_timestamp(date)))
        };

        match action {
            DiaryAction::AddNote { date, text } => {
                if entries.iter().any(|e| e.created_at(&date)) {
                    return Err(DomainError::Validation {
                        message: format!("A diary entry created at {} already exists", canonical_timestamp(&date)),
                    });
                }
                let entry = DiaryEntry::new(date, text)?;
                let mut next = entries.clone();
                next.push(entry.clone());
                Ok(Reduction::changed(next, DiaryChange::Created(entry)))
            }
            DiaryAction::EditNote { date, text } => {
                let index = find(&date)?;
                diary::validate_text(&text)?;
                let mut next = entries.clone();
                next[index].text = text.clone();
                let id = next[index].id.clone();
                Ok(Reduction::changed(next, DiaryChange::Updated { id, text }))
            }
            DiaryAction::DeleteNote { date } => {
                let index = find(&date)?;
                let mut next = entries.clone();
                let removed = next.remove(index);
                Ok(Reduction::changed(next, DiaryChange::Deleted { id: removed.id }))
            }
            DiaryAction::AssignRemoteId { date, id, synced_text } => {
                let Some(index) = entries.iter().position(|e| e.created_at(&date)) else {
                    return Ok(Reduction::changed(entries.clone(), DiaryChange::Deleted { id: Some(id) }));
                };
                let mut next = entries.clone();
                next[index].id = Some(id.clone());
                if next[index].text == synced_text {
                    return Ok(Reduction::unchanged(next));
                }
                let text = next[index].text.clone();
                Ok(Reduction::changed(next, DiaryChange::Updated { id: Some(id), text }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_timestamp;
    use chrono::NaiveDate;

    fn ctx() -> ReduceContext {
        ReduceContext::fixed(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            parse_timestamp("2024-06-15T08:00:00Z").unwrap(),
        )
    }

    fn add(entries: &Vec<DiaryEntry>, date: &str, text: &str) -> Vec<DiaryEntry> {
        DiaryReducer::reduce(
            entries,
            DiaryAction::AddNote {
                date: parse_timestamp(date).unwrap(),
                text: text.to_string(),
            },
            &ctx(),
        )
        .unwrap()
        .state
    }

    #[test]
    fn test_add_edit_delete() {
        let entries = add(&Vec::new(), "2024-06-15T07:00:00Z", "Slept well");
        let entries = add(&entries, "2024-06-15T21:00:00Z", "Long day");
        assert_eq!(entries.len(), 2);

        let date = parse_timestamp("2024-06-15T09:00:00+02:00").unwrap();
        let edited = DiaryReducer::reduce(
            &entries,
            DiaryAction::EditNote {
                date,
                text: "Slept badly".to_string(),
            },
            &ctx(),
        )
        .unwrap();
        assert_eq!(edited.state[0].text, "Slept badly");
        assert_eq!(
            edited.change,
            Some(DiaryChange::Updated {
                id: None,
                text: "Slept badly".to_string()
            })
        );

        let deleted = DiaryReducer::reduce(&edited.state, DiaryAction::DeleteNote { date }, &ctx()).unwrap();
        assert_eq!(deleted.state.len(), 1);
        assert_eq!(deleted.state[0].text, "Long day");
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let entries = add(&Vec::new(), "2024-06-15T07:00:00Z", "One");
        let result = DiaryReducer::reduce(
            &entries,
            DiaryAction::AddNote {
                date: parse_timestamp("2024-06-15T07:00:00.000Z").unwrap(),
                text: "Two".to_string(),
            },
            &ctx(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_assign_remote_id() {
        let entries = add(&Vec::new(), "2024-06-15T07:00:00Z", "One");
        let date = entries[0].date;
        let assigned = DiaryReducer::reduce(
            &entries,
            DiaryAction::AssignRemoteId {
                date,
                id: RemoteId::new("d-1"),
                synced_text: "One".to_string(),
            },
            &ctx(),
        )
        .unwrap();
        assert_eq!(assigned.state[0].id, Some(RemoteId::new("d-1")));
        assert_eq!(assigned.change, None);

        let orphan = DiaryReducer::reduce(
            &Vec::new(),
            DiaryAction::AssignRemoteId {
                date,
                id: RemoteId::new("d-1"),
                synced_text: "One".to_string(),
            },
            &ctx(),
        )
        .unwrap();
        assert_eq!(
            orphan.change,
            Some(DiaryChange::Deleted {
                id: Some(RemoteId::new("d-1"))
            })
        );
    }
}
