//! Settings reducer

use crate::domain::{DomainError, Settings, SettingsPatch};
use crate::reducer::{ReduceContext, Reducer, Reduction};

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    /// Shallow-merge the given options
    Update(SettingsPatch),
}

/// Settings are stored as one row per user, so every change is a full upsert
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    Upsert(Settings),
}

pub struct SettingsReducer;

impl Reducer for SettingsReducer {
    type State = Settings;
    type Action = SettingsAction;
    type Change = SettingsChange;

    fn reduce(
        settings: &Settings,
        action: SettingsAction,
        _ctx: &ReduceContext,
    ) -> Result<Reduction<Settings, SettingsChange>, DomainError> {
        match action {
            SettingsAction::Update(patch) => {
                let next = settings.merged(&patch);
                if next == *settings {
                    return Ok(Reduction::unchanged(next));
                }
                Ok(Reduction::changed(next.clone(), SettingsChange::Upsert(next)))
            }
        }
    }
}
