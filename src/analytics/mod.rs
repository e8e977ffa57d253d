//! Analytics engine for derived statistics and insights
//!
//! Everything here is computed from the habit collection on demand; nothing
//! is stored. Wording of insights is delegated to an `InsightGenerator`, so
//! a remote text service can replace the built-in rules.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{compute_streaks_on, is_complete, Habit, HabitKey};

/// Days covered by the completion rate
pub const RATE_WINDOW_DAYS: i64 = 30;

/// Statistics for one habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub key: HabitKey,
    pub title: String,
    pub frequency: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Number of separate runs
    pub restarts: usize,
    /// Days on which the target was reached
    pub total_completions: usize,
    /// Share of the last 30 days completed, in percent with one decimal
    pub completion_rate: f64,
    pub progress_today: u32,
    pub completed_today: bool,
}

/// Totals across all active habits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub habits_tracked: usize,
    pub completed_today: usize,
    /// Sum of current streaks
    pub total_streak_days: u32,
    pub total_completions: usize,
}

/// Turns statistics into advice
pub trait InsightGenerator: Send + Sync {
    /// Advice for a single habit
    fn habit_insight(&self, stats: &HabitStats) -> String;

    /// Encouragement for the dashboard
    fn motivation(&self, summary: &DashboardSummary) -> String;
}

/// Fixed rules, checked in order; the first that matches wins
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInsights;

impl InsightGenerator for RuleBasedInsights {
    fn habit_insight(&self, stats: &HabitStats) -> String {
        if stats.current_streak >= 7 {
            format!(
                "Excellent consistency! Your {}-day streak shows strong commitment. You've completed this habit {} times with a {:.1}% completion rate this month.",
                stats.current_streak, stats.total_completions, stats.completion_rate
            )
        } else if stats.completion_rate > 70.0 {
            format!(
                "Great work! With a {:.1}% completion rate over 30 days you're building a solid habit. Your longest streak of {} days proves you can keep it up.",
                stats.completion_rate, stats.longest_streak
            )
        } else if stats.total_completions > 20 {
            format!(
                "You're making progress with {} total completions! Your current streak is {} days and you've managed {} before. Try pairing this habit with an existing routine.",
                stats.total_completions, stats.current_streak, stats.longest_streak
            )
        } else if stats.restarts > 3 {
            format!(
                "You've started this habit {} times, which shows persistence. Current streak: {} days. Look at what breaks your streaks and plan around it.",
                stats.restarts, stats.current_streak
            )
        } else {
            format!(
                "You're at the beginning of your journey with {} completions and a {:.1}% rate. Start small and focus on showing up daily.",
                stats.total_completions, stats.completion_rate
            )
        }
    }

    fn motivation(&self, summary: &DashboardSummary) -> String {
        if summary.habits_tracked == 0 {
            "Start by creating your first habit to track!".to_string()
        } else if summary.total_completions == 0 {
            "Great job creating habits! Now start logging your progress.".to_string()
        } else if summary.completed_today > 0 {
            format!(
                "You're on fire! {} of {} habits completed today and {} streak days in total.",
                summary.completed_today, summary.habits_tracked, summary.total_streak_days
            )
        } else {
            format!(
                "You've completed {} habit tasks so far. Every completion is a vote for the person you want to become.",
                summary.total_completions
            )
        }
    }
}

/// Analytics engine for processing habit data
pub struct AnalyticsEngine {
    today: NaiveDate,
    insights: Box<dyn InsightGenerator>,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsEngine {
    /// Engine for the local calendar day with the built-in rules
    pub fn new() -> Self {
        Self::on(Local::now().date_naive())
    }

    /// Engine pinned to a given "today"
    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            insights: Box::new(RuleBasedInsights),
        }
    }

    pub fn with_insights(mut self, insights: Box<dyn InsightGenerator>) -> Self {
        self.insights = insights;
        self
    }

    pub fn habit_stats(&self, habit: &Habit) -> HabitStats {
        let summary = compute_streaks_on(&habit.completed_days, habit.frequency, self.today);
        let window_start = self.today - Duration::days(RATE_WINDOW_DAYS - 1);

        let completed = || {
            habit
                .completed_days
                .iter()
                .filter(|d| is_complete(d, habit.frequency))
        };
        let total_completions = completed().count();
        let recent = completed()
            .filter(|d| d.date >= window_start && d.date <= self.today)
            .count();
        let completion_rate = (recent as f64 / RATE_WINDOW_DAYS as f64 * 1000.0).round() / 10.0;

        HabitStats {
            key: habit.key,
            title: habit.title.clone(),
            frequency: habit.frequency,
            current_streak: summary.current_streak,
            longest_streak: summary.longest_streak,
            restarts: summary.restarts(),
            total_completions,
            completion_rate,
            progress_today: habit.progress_on(self.today),
            completed_today: habit.is_complete_on(self.today),
        }
    }

    /// Summary over non-archived habits
    pub fn dashboard(&self, habits: &[Habit]) -> DashboardSummary {
        habits
            .iter()
            .filter(|h| !h.is_archived)
            .map(|h| self.habit_stats(h))
            .fold(DashboardSummary::default(), |mut summary, stats| {
                summary.habits_tracked += 1;
                summary.total_streak_days += stats.current_streak;
                summary.total_completions += stats.total_completions;
                if stats.completed_today {
                    summary.completed_today += 1;
                }
                summary
            })
    }

    pub fn habit_insight(&self, habit: &Habit) -> String {
        self.insights.habit_insight(&self.habit_stats(habit))
    }

    pub fn motivation(&self, habits: &[Habit]) -> String {
        self.insights.motivation(&self.dashboard(habits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompletedDay, HabitDraft};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn habit_with(days: &[(i64, u32)], frequency: u32) -> Habit {
        let mut habit = Habit::from_draft(HabitDraft::new("Read", frequency), HabitKey::new(), crate::domain::now_millis());
        habit.completed_days = days
            .iter()
            .map(|(ago, progress)| CompletedDay::new(today() - Duration::days(*ago), *progress))
            .collect();
        habit
    }

    #[test]
    fn test_habit_stats() {
        let habit = habit_with(&[(0, 1), (1, 1), (5, 1), (40, 1), (2, 0)], 1);
        let stats = AnalyticsEngine::on(today()).habit_stats(&habit);

        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.restarts, 3);
        assert_eq!(stats.total_completions, 4);
        assert_eq!(stats.completion_rate, 10.0);
        assert!(stats.completed_today);
    }

    #[test]
    fn test_dashboard_skips_archived() {
        let active = habit_with(&[(0, 2), (1, 2)], 2);
        let mut archived = habit_with(&[(0, 1)], 1);
        archived.is_archived = true;

        let summary = AnalyticsEngine::on(today()).dashboard(&[active, archived]);
        assert_eq!(
            summary,
            DashboardSummary {
                habits_tracked: 1,
                completed_today: 1,
                total_streak_days: 2,
                total_completions: 2,
            }
        );
    }

    #[test]
    fn test_insight_tiers() {
        let engine = AnalyticsEngine::on(today());

        let week: Vec<(i64, u32)> = (0..7).map(|ago| (ago, 1)).collect();
        assert!(engine.habit_insight(&habit_with(&week, 1)).starts_with("Excellent consistency"));

        let scattered: Vec<(i64, u32)> = (0..5).map(|n| (n * 2 + 3, 1)).collect();
        assert!(engine
            .habit_insight(&habit_with(&scattered, 1))
            .starts_with("You've started this habit 5 times"));

        assert!(engine.habit_insight(&habit_with(&[], 1)).starts_with("You're at the beginning"));
    }

    #[test]
    fn test_custom_generator() {
        struct Fixed;
        impl InsightGenerator for Fixed {
            fn habit_insight(&self, _stats: &HabitStats) -> String {
                "habit".to_string()
            }
            fn motivation(&self, _summary: &DashboardSummary) -> String {
                "go".to_string()
            }
        }

        let engine = AnalyticsEngine::on(today()).with_insights(Box::new(Fixed));
        assert_eq!(engine.motivation(&[]), "go");
    }
}
