//! User settings
//!
//! Settings are a flat set of named options. The known options are typed;
//! anything else a client stored is carried along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{CalendarView, Theme};

fn default_true() -> bool {
    true
}

/// All user options, merged shallowly on update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub calendar_view: CalendarView,
    #[serde(default = "default_true")]
    pub calendar_highlight_today: bool,
    /// Options this crate doesn't interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            calendar_view: CalendarView::default(),
            calendar_highlight_today: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Shallow merge: every option present in the patch replaces the current one
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(theme) = patch.theme {
            next.theme = theme;
        }
        if let Some(view) = patch.calendar_view {
            next.calendar_view = view;
        }
        if let Some(highlight) = patch.calendar_highlight_today {
            next.calendar_highlight_today = highlight;
        }
        for (name, value) in &patch.extra {
            next.extra.insert(name.clone(), value.clone());
        }
        next
    }
}

/// A set of option changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_view: Option<CalendarView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_highlight_today: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsPatch {
    pub fn theme(theme: Theme) -> Self {
        Self {
            theme: Some(theme),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.calendar_view.is_none()
            && self.calendar_highlight_today.is_none()
            && self.extra.is_empty()
    }
}
