//! Settings and achievements

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Achievement, CalendarView, DomainError, Settings, SettingsPatch, Theme};
use crate::reducer::{AchievementAction, SettingsAction};
use crate::{AppError, HabitApp};

/// Parameters for changing settings; unset fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct SettingsParams {
    pub theme: Option<String>,
    pub calendar_view: Option<String>,
    pub highlight_today: Option<bool>,
    /// Other options as `name=value`; values are parsed as JSON when possible
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: Settings,
    pub message: String,
}

fn option_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn update_settings(app: &HabitApp, params: SettingsParams) -> Result<SettingsResponse, AppError> {
    let mut patch = SettingsPatch::default();

    if let Some(theme) = params.theme {
        patch.theme = Some(Theme::parse(&theme).ok_or_else(|| DomainError::Validation {
            message: format!("Invalid theme '{}'. Valid options: light, dark, auto", theme),
        })?);
    }
    if let Some(view) = params.calendar_view {
        patch.calendar_view = Some(CalendarView::parse(&view).ok_or_else(|| DomainError::Validation {
            message: format!("Invalid calendar view '{}'. Valid options: default, compact", view),
        })?);
    }
    patch.calendar_highlight_today = params.highlight_today;

    for option in &params.options {
        let (name, raw) = option.split_once('=').ok_or_else(|| DomainError::Validation {
            message: format!("Expected name=value, got '{}'", option),
        })?;
        patch.extra.insert(name.trim().to_string(), option_value(raw.trim()));
    }

    let store = &app.stores().settings;
    let message = if patch.is_empty() {
        "Current settings".to_string()
    } else {
        store.dispatch(SettingsAction::Update(patch))?;
        "Settings updated".to_string()
    };

    Ok(SettingsResponse {
        settings: store.data(),
        message,
    })
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub newly_unlocked: bool,
    pub achievements: Vec<Achievement>,
    pub message: String,
}

pub fn unlock_achievement(app: &HabitApp, key: &str, title: Option<&str>) -> Result<UnlockResponse, AppError> {
    let store = &app.stores().achievements;
    let before = store.data().len();
    store.dispatch(AchievementAction::Unlock {
        key: key.trim().to_string(),
        title: title.unwrap_or(key).trim().to_string(),
    })?;

    let achievements = store.data();
    let newly_unlocked = achievements.len() > before;
    let message = if newly_unlocked {
        format!("Achievement unlocked: {}", title.unwrap_or(key).trim())
    } else {
        format!("Achievement '{}' was already unlocked", key.trim())
    };

    Ok(UnlockResponse {
        newly_unlocked,
        achievements,
        message,
    })
}
