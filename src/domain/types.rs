//! Core identifier and option types used throughout the domain layer
//!
//! This module defines the ID wrappers (local key, remote id, user id), the
//! settings option enums, and the canonical timestamp format shared by habits
//! and diary entries.

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable local identifier for a habit
///
/// Generated once when the habit is created and never changed afterwards, so
/// renaming a habit can't misroute later edits. This is distinct from the
/// remote id, which only exists after the first successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitKey(pub Uuid);

impl HabitKey {
    /// Generate a new random habit key
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a key from its string form
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for HabitKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the remote store on first insert
///
/// Opaque to this crate: the remote decides the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the owning user, as reported by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Color scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the system preference
    #[default]
    Auto,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "auto" => Some(Theme::Auto),
            _ => None,
        }
    }
}

/// Calendar layout on the habit cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Default,
    Compact,
}

impl CalendarView {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(CalendarView::Default),
            "compact" => Some(CalendarView::Compact),
            _ => None,
        }
    }
}

/// Current time truncated to millisecond precision
///
/// Timestamps are persisted with millisecond precision, so anything we create
/// locally is truncated up front to compare equal after a round trip.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Render a timestamp in the one canonical form used for storage and lookups
/// (e.g. `2024-03-01T08:30:00.000Z`)
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC, normalizing offsets and precision
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s.trim())?
        .with_timezone(&Utc)
        .trunc_subsecs(3))
}

/// Serde adapter that writes timestamps in canonical form and accepts any
/// RFC 3339 input
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::canonical_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_normalize_to_same_instant() {
        let a = parse_timestamp("2024-03-01T10:30:00+02:00").unwrap();
        let b = parse_timestamp("2024-03-01T08:30:00.000Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(canonical_timestamp(&a), "2024-03-01T08:30:00.000Z");
    }

    #[test]
    fn test_sub_millisecond_precision_is_dropped() {
        let a = parse_timestamp("2024-03-01T08:30:00.123456Z").unwrap();
        assert_eq!(canonical_timestamp(&a), "2024-03-01T08:30:00.123Z");
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
        assert_eq!(CalendarView::parse("compact"), Some(CalendarView::Compact));
    }
}
