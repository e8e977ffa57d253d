//! Achievements reducer
//!
//! Append-only: unlocking adds a record, nothing removes one.

use crate::domain::{Achievement, DomainError};
use crate::reducer::{ReduceContext, Reducer, Reduction};

#[derive(Debug, Clone, PartialEq)]
pub enum AchievementAction {
    Unlock { key: String, title: String },
}

/// The list is stored as one row per user, so every change is a full upsert
#[derive(Debug, Clone, PartialEq)]
pub enum AchievementsChange {
    Upsert(Vec<Achievement>),
}

pub struct AchievementsReducer;

impl Reducer for AchievementsReducer {
    type State = Vec<Achievement>;
    type Action = AchievementAction;
    type Change = AchievementsChange;

    fn reduce(
        achievements: &Vec<Achievement>,
        action: AchievementAction,
        ctx: &ReduceContext,
    ) -> Result<Reduction<Vec<Achievement>, AchievementsChange>, DomainError> {
        match action {
            AchievementAction::Unlock { key, title } => {
                if key.trim().is_empty() {
                    return Err(DomainError::Validation {
                        message: "Achievement key cannot be empty".to_string(),
                    });
                }
                if achievements.iter().any(|a| a.key == key) {
                    return Ok(Reduction::unchanged(achievements.clone()));
                }
                let mut next = achievements.clone();
                next.push(Achievement::new(key, title, ctx.now));
                Ok(Reduction::changed(next.clone(), AchievementsChange::Upsert(next)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlock(key: &str) -> AchievementAction {
        AchievementAction::Unlock {
            key: key.to_string(),
            title: key.to_uppercase(),
        }
    }

    #[test]
    fn test_unlock_is_append_only_and_idempotent() {
        let ctx = ReduceContext::system();
        let first = AchievementsReducer::reduce(&Vec::new(), unlock("streak-7"), &ctx).unwrap();
        assert_eq!(first.state.len(), 1);
        assert!(first.change.is_some());

        let second = AchievementsReducer::reduce(&first.state, unlock("streak-7"), &ctx).unwrap();
        assert_eq!(second.state, first.state);
        assert_eq!(second.change, None);

        let third = AchievementsReducer::reduce(&first.state, unlock("first-habit"), &ctx).unwrap();
        assert_eq!(third.state.len(), 2);
        assert_eq!(third.state[0].key, "streak-7");
    }

    #[test]
    fn test_empty_key_rejected() {
        let ctx = ReduceContext::system();
        assert!(AchievementsReducer::reduce(&Vec::new(), unlock("  "), &ctx).is_err());
    }
}
