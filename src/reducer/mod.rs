//! Entity reducers
//!
//! One pure function per entity family mapping `(collection, action)` to a new
//! collection. Reducers never touch storage: alongside the new state they
//! describe the single-entity change the sync layer should replicate.

pub mod achievements;
pub mod diary;
pub mod habits;
pub mod settings;

pub use achievements::{AchievementAction, AchievementsChange, AchievementsReducer};
pub use diary::{DiaryAction, DiaryChange, DiaryReducer};
pub use habits::{HabitAction, HabitChange, HabitsReducer};
pub use settings::{SettingsAction, SettingsChange, SettingsReducer};

use std::fmt::Debug;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{now_millis, DomainError};

/// Clock values a reducer may read
///
/// Passed in rather than read inside the reducer so reductions stay pure and
/// tests can pin "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceContext {
    /// Local calendar day used for progress tracking
    pub today: NaiveDate,
    /// Creation timestamp for new records
    pub now: DateTime<Utc>,
}

impl ReduceContext {
    /// Context from the system clock
    pub fn system() -> Self {
        Self {
            today: Local::now().date_naive(),
            now: now_millis(),
        }
    }

    pub fn fixed(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }
}

/// Result of applying one action
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction<S, C> {
    /// The collection after the action
    pub state: S,
    /// What to replicate remotely, `None` when nothing observable changed
    pub change: Option<C>,
}

impl<S, C> Reduction<S, C> {
    pub fn changed(state: S, change: C) -> Self {
        Self {
            state,
            change: Some(change),
        }
    }

    pub fn unchanged(state: S) -> Self {
        Self { state, change: None }
    }
}

/// A pure state transition for one entity family
pub trait Reducer: Send + Sync + 'static {
    /// The collection; serializable so it can be snapshotted locally
    type State: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Action: Debug + Send + 'static;
    type Change: Debug + Send + 'static;

    /// Apply an action, returning the new collection or rejecting the action
    fn reduce(
        state: &Self::State,
        action: Self::Action,
        ctx: &ReduceContext,
    ) -> Result<Reduction<Self::State, Self::Change>, DomainError>;
}
