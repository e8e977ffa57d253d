//! Listing habits with their statistics

use serde::{Deserialize, Serialize};

use crate::analytics::{DashboardSummary, HabitStats};
use crate::commands::resolve_habit;
use crate::{AppError, HabitApp, LoadStatus};

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize)]
pub struct ListHabitsParams {
    pub include_archived: bool,
    /// "position" (default), "title", "streak" or "rate"
    pub sort_by: Option<String>,
}

/// One line of the habit list
#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub habit_key: String,
    pub title: String,
    pub frequency: u32,
    pub progress_today: u32,
    pub current_streak: u32,
    pub completion_rate: f64,
    pub is_archived: bool,
    /// Whether the remote assigned an id yet
    pub synced: bool,
}

/// Response from listing habits
#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<HabitSummary>,
    pub summary: DashboardSummary,
    pub status: LoadStatus,
    pub message: String,
}

pub fn list_habits(app: &HabitApp, params: ListHabitsParams) -> Result<ListHabitsResponse, AppError> {
    let view = app.stores().habits.view();
    let analytics = app.analytics();

    let mut habits: Vec<HabitSummary> = view
        .data
        .iter()
        .filter(|h| params.include_archived || !h.is_archived)
        .map(|habit| {
            let stats = analytics.habit_stats(habit);
            HabitSummary {
                habit_key: habit.key.to_string(),
                title: habit.title.clone(),
                frequency: habit.frequency,
                progress_today: stats.progress_today,
                current_streak: stats.current_streak,
                completion_rate: stats.completion_rate,
                is_archived: habit.is_archived,
                synced: habit.is_synced(),
            }
        })
        .collect();

    match params.sort_by.as_deref().map(str::trim) {
        None | Some("") | Some("position") => {}
        Some("title") => habits.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        Some("streak") => habits.sort_by(|a, b| b.current_streak.cmp(&a.current_streak)),
        Some("rate") => habits.sort_by(|a, b| b.completion_rate.total_cmp(&a.completion_rate)),
        Some(other) => {
            return Err(crate::DomainError::Validation {
                message: format!(
                    "Invalid sort '{}'. Valid options: position, title, streak, rate",
                    other
                ),
            }
            .into())
        }
    }

    let summary = analytics.dashboard(&view.data);

    let mut message = if habits.is_empty() {
        "No habits found. Create your first habit to get started!".to_string()
    } else {
        let lines: Vec<String> = habits
            .iter()
            .map(|h| {
                format!(
                    "{} {} ({}...)  {}/{} today | streak {} | {:.1}% last 30 days{}{}",
                    if h.progress_today >= h.frequency { "[x]" } else { "[ ]" },
                    h.title,
                    &h.habit_key[..8],
                    h.progress_today,
                    h.frequency,
                    h.current_streak,
                    h.completion_rate,
                    if h.is_archived { " | archived" } else { "" },
                    if h.synced { "" } else { " | not synced" },
                )
            })
            .collect();
        format!(
            "{} of {} habits completed today\n\n{}",
            summary.completed_today,
            summary.habits_tracked,
            lines.join("\n")
        )
    };
    if let Some(error) = &view.error {
        message.push_str(&format!("\n\nRemote load failed, showing cached data: {}", error));
    }

    Ok(ListHabitsResponse {
        habits,
        summary,
        status: view.status,
        message,
    })
}

/// Parameters for the stats command
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    /// One habit, or all active habits when omitted
    pub habit: Option<String>,
}

/// Response from the stats command
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub habits: Vec<HabitStats>,
    pub dashboard: DashboardSummary,
    pub insights: Vec<String>,
    pub motivation: String,
    pub message: String,
}

pub fn habit_stats(app: &HabitApp, params: StatsParams) -> Result<StatsResponse, AppError> {
    let all = app.stores().habits.data();
    let analytics = app.analytics();

    let selected: Vec<_> = match &params.habit {
        Some(reference) => {
            let key = resolve_habit(&all, reference)?;
            all.iter().filter(|h| h.key == key).collect()
        }
        None => all.iter().filter(|h| !h.is_archived).collect(),
    };

    let habits: Vec<HabitStats> = selected.iter().map(|h| analytics.habit_stats(h)).collect();
    let insights: Vec<String> = selected.iter().map(|h| analytics.habit_insight(h)).collect();
    let dashboard = analytics.dashboard(&all);
    let motivation = analytics.motivation(&all);

    let details: Vec<String> = habits
        .iter()
        .zip(&insights)
        .map(|(s, insight)| {
            format!(
                "{}\n   Current streak: {} days | Best: {} days | Runs: {} | Completions: {} | Rate: {:.1}%\n   {}",
                s.title, s.current_streak, s.longest_streak, s.restarts, s.total_completions, s.completion_rate, insight
            )
        })
        .collect();

    let message = format!(
        "Tracking {} habits | {} completed today | {} streak days | {} completions\n{}\n\n{}",
        dashboard.habits_tracked,
        dashboard.completed_today,
        dashboard.total_streak_days,
        dashboard.total_completions,
        motivation,
        details.join("\n\n")
    );

    Ok(StatsResponse {
        habits,
        dashboard,
        insights,
        motivation,
        message,
    })
}
