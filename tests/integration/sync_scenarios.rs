/// End-to-end behaviour of the stores against in-memory collaborators
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use habit_sync::storage::{RemoteCall, ACHIEVEMENTS_KEY, HABITS_KEY, MAIN_DIARY_KEY, SETTINGS_KEY};
use habit_sync::*;

use crate::{add_habit, memory_app};

fn fixed_day() -> ReduceContext {
    ReduceContext::fixed(
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        parse_timestamp("2024-06-15T08:00:00Z").unwrap(),
    )
}

#[tokio::test]
async fn test_offline_mode_never_writes_remote() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    t.app.start().await;
    let stores = t.app.stores();

    let key = add_habit(&t.app, "Read", 2);
    stores.habits.dispatch(HabitAction::UpdateProgress { key }).unwrap();
    stores
        .settings
        .dispatch(SettingsAction::Update(SettingsPatch::theme(Theme::Dark)))
        .unwrap();
    stores
        .achievements
        .dispatch(AchievementAction::Unlock {
            key: "first-habit".to_string(),
            title: "First habit".to_string(),
        })
        .unwrap();
    stores
        .diary
        .dispatch(DiaryAction::AddNote {
            date: now_millis(),
            text: "Day one".to_string(),
        })
        .unwrap();
    t.app.stores().wait_idle().await;

    assert!(t.remote.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    for key in [HABITS_KEY, SETTINGS_KEY, ACHIEVEMENTS_KEY, MAIN_DIARY_KEY] {
        assert_eq!(t.local.write_count(key), 1, "snapshot for {}", key);
    }
}

#[tokio::test]
async fn test_noop_dispatch_still_snapshots_offline() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    let key = add_habit(&t.app, "Read", 1);
    let habits = &t.app.stores().habits;
    habits.dispatch_with(HabitAction::UpdateProgress { key }, &fixed_day()).unwrap();
    habits.flush().unwrap();
    assert_eq!(t.local.write_count(HABITS_KEY), 1);

    // Already complete: state unchanged, snapshot still written
    habits.dispatch_with(HabitAction::UpdateProgress { key }, &fixed_day()).unwrap();
    habits.flush().unwrap();
    assert_eq!(t.local.write_count(HABITS_KEY), 2);
}

#[tokio::test]
async fn test_progress_stops_at_frequency() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    let key = add_habit(&t.app, "Drink water", 3);
    let habits = &t.app.stores().habits;

    for _ in 0..4 {
        habits
            .dispatch_with(HabitAction::UpdateProgress { key }, &fixed_day())
            .unwrap();
    }

    let habit = habits.data().into_iter().find(|h| h.key == key).unwrap();
    assert_eq!(
        habit.completed_days,
        vec![CompletedDay::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 3)]
    );
}

#[tokio::test]
async fn test_add_then_delete_restores_collection() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    t.app.sign_in("ada@example.com").await.unwrap();
    add_habit(&t.app, "Run", 1);
    t.app.stores().wait_idle().await;
    let before = t.app.stores().habits.data();

    let key = add_habit(&t.app, "Read", 1);
    t.app.stores().habits.dispatch(HabitAction::Delete { key }).unwrap();
    t.app.stores().wait_idle().await;

    assert_eq!(t.app.stores().habits.data(), before);
    let user = t.app.current_user().unwrap().id;
    assert_eq!(t.remote.habits_of(&user).len(), 1);
}

#[tokio::test]
async fn test_online_changes_reach_remote() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    t.app.sign_in("ada@example.com").await.unwrap();
    let stores = t.app.stores();

    let key = add_habit(&t.app, "Read", 1);
    t.app.stores().wait_idle().await;
    stores.habits.dispatch(HabitAction::UpdateProgress { key }).unwrap();
    stores.habits.dispatch(HabitAction::Archive { key }).unwrap();
    stores
        .settings
        .dispatch(SettingsAction::Update(SettingsPatch::theme(Theme::Light)))
        .unwrap();
    t.app.stores().wait_idle().await;

    let user = t.app.current_user().unwrap().id;
    let remote_habit = &t.remote.habits_of(&user)[0];
    assert!(remote_habit.is_archived);
    assert_eq!(remote_habit.completed_days.len(), 1);

    let writes = t.remote.writes();
    assert_eq!(writes.iter().filter(|c| matches!(c, RemoteCall::UpdateHabit { .. })).count(), 2);
    assert!(writes.contains(&RemoteCall::UpsertSettings));
}

#[tokio::test]
async fn test_remote_failure_is_not_rolled_back() {
    let remote = Arc::new(MemoryRemote::new());
    let t = memory_app(remote.clone());
    t.app.sign_in("ada@example.com").await.unwrap();

    let failures = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = failures.clone();
    t.app
        .stores()
        .tasks()
        .on_failure(Arc::new(move |f: &habit_sync::sync::RemoteFailure| {
            sink.lock().unwrap().push(f.family);
        }));

    remote.set_failure(Some(RemoteError::Unavailable("network down".to_string())));
    add_habit(&t.app, "Read", 1);
    t.app.stores().wait_idle().await;

    assert_eq!(t.app.stores().habits.data().len(), 1);
    assert_eq!(*failures.lock().unwrap(), vec!["habits"]);
}

#[tokio::test]
async fn test_load_error_flag_and_retry() {
    let remote = Arc::new(MemoryRemote::new());
    let t = memory_app(remote.clone());
    add_habit(&t.app, "Cached", 1);

    remote.set_failure(Some(RemoteError::Unavailable("timeout".to_string())));
    t.app.sign_in("ada@example.com").await.unwrap();

    let habits = t.app.stores().habits.view();
    assert_eq!(habits.status, LoadStatus::Error);
    assert!(habits.error.is_some());
    assert_eq!(habits.data.len(), 1);

    remote.set_failure(None);
    t.app.refresh().await.unwrap();
    assert_eq!(t.app.stores().habits.status(), LoadStatus::Ready);
    assert_eq!(t.app.stores().settings.status(), LoadStatus::Ready);
}

#[tokio::test]
async fn test_sign_out_switches_to_offline() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    t.app.sign_in("ada@example.com").await.unwrap();
    t.app.sign_out().await.unwrap();
    let calls_before = t.remote.calls().len();

    add_habit(&t.app, "Read", 1);
    t.app.stores().wait_idle().await;

    assert!(t.app.current_user().is_none());
    assert_eq!(t.remote.calls().len(), calls_before);
}

#[tokio::test]
async fn test_rejected_action_reports_error() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    add_habit(&t.app, "Read", 1);

    let result = t.app.stores().habits.dispatch(HabitAction::add(HabitDraft::new("Read", 1)));
    assert_eq!(result, Err(DomainError::DuplicateTitle("Read".to_string())));

    let result = t.app.stores().habits.dispatch(HabitAction::add(HabitDraft::new("Walk", 0)));
    assert!(matches!(result, Err(DomainError::InvalidFrequency(_))));
    assert_eq!(t.app.stores().habits.data().len(), 1);
}
