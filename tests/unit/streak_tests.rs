/// Streak utility behaviour on realistic histories
use chrono::{Duration, NaiveDate};
use habit_sync::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn days(offsets: &[i64]) -> Vec<CompletedDay> {
    offsets
        .iter()
        .map(|ago| CompletedDay::new(today() - Duration::days(*ago), 1))
        .collect()
}

#[test]
fn test_single_one_day_gap_splits_history() {
    // 0,1,2 then a missing day 3, then 4,5
    let summary = compute_streaks_on(&days(&[0, 1, 2, 4, 5]), 1, today());
    assert_eq!(summary.all_streaks.len(), 2);
    assert_eq!(summary.current_streak, 3);
    assert_eq!(summary.longest_streak, 3);
}

#[test]
fn test_current_streak_zero_after_two_missed_days() {
    let summary = compute_streaks_on(&days(&[2, 3, 4]), 1, today());
    assert_eq!(summary.current_streak, 0);
    assert_eq!(summary.longest_streak, 3);
}

#[test]
fn test_today_yesterday_and_isolated_day() {
    let summary = compute_streaks_on(&days(&[0, 1, 5]), 1, today());
    assert_eq!(summary.current_streak, 2);
    assert_eq!(summary.longest_streak, 2);
    assert_eq!(summary.all_streaks.len(), 2);
}

#[test]
fn test_streak_across_month_boundary() {
    // Feb 2024 has 29 days
    let summary = compute_streaks_on(&days(&[0, 1, 2]), 1, today());
    let run = summary.all_streaks[0];
    assert_eq!(run.start, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    assert_eq!(run.end, today());
}

#[test]
fn test_incomplete_days_break_runs() {
    let mut history = days(&[0, 2]);
    history.push(CompletedDay::new(today() - Duration::days(1), 1));
    let summary = compute_streaks_on(&history, 2, today());
    assert_eq!(summary, StreakSummary::default());

    assert!(is_complete(&CompletedDay::new(today(), 2), 2));
    assert!(!is_complete(&CompletedDay::new(today(), 1), 2));
}
