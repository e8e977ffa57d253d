//! Streak calculation
//!
//! Pure functions that decide whether a day counts as complete and derive
//! current/longest streaks from a habit's completion history. Streaks are
//! never persisted; they are recomputed from `completed_days` on demand.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::CompletedDay;

/// Whether a day's progress reached the daily target
pub fn is_complete(day: &CompletedDay, frequency: u32) -> bool {
    day.progress >= frequency
}

/// A maximal run of consecutive complete days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakRun {
    /// First (oldest) day of the run
    pub start: NaiveDate,
    /// Last (most recent) day of the run
    pub end: NaiveDate,
    pub length: u32,
}

impl StreakRun {
    fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            length: 1,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Streak statistics derived from a completion history
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    /// Length of the run touching today (or yesterday), else 0
    pub current_streak: u32,
    /// Longest run ever
    pub longest_streak: u32,
    /// Every run, most recent first
    pub all_streaks: Vec<StreakRun>,
}

impl StreakSummary {
    /// Number of times the habit was (re)started
    pub fn restarts(&self) -> usize {
        self.all_streaks.len()
    }
}

/// Compute streaks relative to the local calendar day
pub fn compute_streaks(completed_days: &[CompletedDay], frequency: u32) -> StreakSummary {
    compute_streaks_on(completed_days, frequency, Local::now().date_naive())
}

/// Compute streaks relative to an explicit "today"
///
/// Duplicate dates are collapsed first; the later entry in the input wins.
/// A streak that ended yesterday still counts as current so it isn't lost
/// the moment midnight passes.
pub fn compute_streaks_on(completed_days: &[CompletedDay], frequency: u32, today: NaiveDate) -> StreakSummary {
    let mut by_date: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for day in completed_days {
        by_date.insert(day.date, day.progress);
    }

    let mut runs: Vec<StreakRun> = Vec::new();
    for (date, progress) in by_date.iter().rev() {
        if *progress < frequency {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.start.pred_opt() == Some(*date) => {
                run.start = *date;
                run.length += 1;
            }
            _ => runs.push(StreakRun::single(*date)),
        }
    }

    let longest_streak = runs.iter().map(|r| r.length).max().unwrap_or(0);

    let current_streak = runs
        .iter()
        .find(|r| r.contains(today))
        .or_else(|| {
            today
                .pred_opt()
                .and_then(|yesterday| runs.iter().find(|r| r.contains(yesterday)))
        })
        .map(|r| r.length)
        .unwrap_or(0);

    StreakSummary {
        current_streak,
        longest_streak,
        all_streaks: runs,
    }
}
