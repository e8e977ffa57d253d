//! Unlocked achievements
//!
//! The achievement list is append-only: records are added when unlocked and
//! never removed by the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::{now_millis, timestamp};

/// A single unlocked achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Stable achievement identifier (e.g. `streak-7`)
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "now_millis", with = "timestamp")]
    pub unlocked_at: DateTime<Utc>,
}

impl Achievement {
    pub fn new(key: impl Into<String>, title: impl Into<String>, unlocked_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            unlocked_at,
        }
    }
}
