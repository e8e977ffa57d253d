/// Bulk export and import
use std::sync::Arc;

use habit_sync::storage::{load_snapshot, RemoteCall, HABITS_KEY};
use habit_sync::*;

use crate::{add_habit, memory_app};

/// Habit fields that survive a round trip (ids and keys are reassigned)
fn content(habits: &[Habit]) -> Vec<(String, u32, String, u32, Vec<CompletedDay>, bool, String, Vec<String>)> {
    habits
        .iter()
        .map(|h| {
            (
                h.title.clone(),
                h.color_index,
                h.icon_title.clone(),
                h.frequency,
                h.completed_days.clone(),
                h.is_archived,
                canonical_timestamp(&h.creation_date),
                h.diary.iter().map(|n| n.text.clone()).collect(),
            )
        })
        .collect()
}

async fn populated_app() -> crate::TestApp {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    t.app.sign_in("ada@example.com").await.unwrap();
    let stores = t.app.stores();

    let read = add_habit(&t.app, "Read", 1);
    let run = add_habit(&t.app, "Run", 2);
    stores.habits.dispatch(HabitAction::UpdateProgress { key: read }).unwrap();
    stores.habits.dispatch(HabitAction::UpdateProgress { key: run }).unwrap();
    stores
        .habits
        .dispatch(HabitAction::AddNote {
            key: read,
            date: now_millis(),
            text: "Chapter 3".to_string(),
        })
        .unwrap();
    stores
        .settings
        .dispatch(SettingsAction::Update(SettingsPatch::theme(Theme::Dark)))
        .unwrap();
    stores
        .achievements
        .dispatch(AchievementAction::Unlock {
            key: "first".to_string(),
            title: "First".to_string(),
        })
        .unwrap();
    stores
        .diary
        .dispatch(DiaryAction::AddNote {
            date: now_millis(),
            text: "Good week".to_string(),
        })
        .unwrap();
    t.app.stores().wait_idle().await;
    t
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let source = populated_app().await;
    let doc = source.app.export();

    let target = memory_app(Arc::new(MemoryRemote::new()));
    target.app.sign_in("grace@example.com").await.unwrap();
    let summary = target.app.import(doc.clone().into()).await.unwrap();

    assert!(summary.synced);
    assert_eq!(summary.habits, Some(2));

    let habits = target.app.stores().habits.data();
    assert_eq!(content(&habits), content(&doc.habits));
    assert!(habits.iter().all(|h| h.id.is_some()));
    assert_eq!(target.app.stores().settings.data().theme, Theme::Dark);
    assert_eq!(target.app.stores().achievements.data(), doc.achievements);
    assert_eq!(target.app.stores().diary.data().len(), 1);

    let writes = target.remote.writes();
    assert!(writes.contains(&RemoteCall::ReplaceHabits { count: 2 }));
    assert!(writes.contains(&RemoteCall::ReplaceDiary { count: 1 }));
}

#[tokio::test]
async fn test_export_is_detached_from_stores() {
    let source = populated_app().await;
    let doc = source.app.export();

    add_habit(&source.app, "Swim", 1);
    assert_eq!(doc.habits.len(), 2);
    assert_eq!(source.app.stores().habits.data().len(), 3);
}

#[tokio::test]
async fn test_export_json_parses_back() {
    let source = populated_app().await;
    let json = source.app.export().to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    for key in ["habits", "settings", "achievements", "mainDiary", "exportDate"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }

    let doc = ImportDocument::parse(&json).unwrap();
    assert_eq!(doc.habits.map(|h| h.len()), Some(2));
}

#[tokio::test]
async fn test_import_rejected_by_remote_keeps_local_state() {
    let t = populated_app().await;
    let before = t.app.stores().habits.data();

    t.remote.set_failure(Some(RemoteError::Rejected("quota exceeded".to_string())));
    let json = r#"{"habits": [{"title": "Imported", "frequency": 1}]}"#;
    let result = t.app.import_json(json).await;

    assert!(matches!(
        result,
        Err(AppError::Transfer(TransferError::Remote { family: "habits", .. }))
    ));
    assert_eq!(t.app.stores().habits.data(), before);
}

#[tokio::test]
async fn test_malformed_import_is_reported() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    add_habit(&t.app, "Read", 1);

    let result = t.app.import_json("this is not json").await;
    assert!(matches!(result, Err(AppError::Transfer(TransferError::Malformed(_)))));
    assert_eq!(t.app.stores().habits.data().len(), 1);
}

#[tokio::test]
async fn test_offline_import_replaces_local_only() {
    let t = memory_app(Arc::new(MemoryRemote::new()));
    add_habit(&t.app, "Old", 1);

    let json = r#"{
        "habits": [{"title": "Imported", "frequency": 2, "completedDays": [{"date": "2024-06-15", "progress": 2}]}],
        "exportDate": "2024-06-16T10:00:00.000Z"
    }"#;
    let summary = t.app.import_json(json).await.unwrap();

    assert!(!summary.synced);
    assert!(!summary.settings);
    assert!(t.remote.calls().is_empty());

    let habits = t.app.stores().habits.data();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].title, "Imported");

    t.app.shutdown().await.unwrap();
    let saved: Vec<Habit> = load_snapshot(t.local.as_ref(), HABITS_KEY).unwrap().unwrap();
    assert_eq!(saved[0].title, "Imported");
}

#[tokio::test]
async fn test_invalid_habits_rejected_before_any_write() {
    let t = populated_app().await;
    let before = t.app.stores().habits.data();
    let writes_before = t.remote.writes().len();

    let json = r#"{
        "habits": [{"title": "Stretch", "frequency": 0}],
        "settings": {"theme": "light"}
    }"#;
    let result = t.app.import_json(json).await;

    assert!(matches!(
        result,
        Err(AppError::Transfer(TransferError::InvalidHabit { .. }))
    ));
    assert_eq!(t.app.stores().habits.data(), before);
    assert_eq!(t.remote.writes().len(), writes_before);
}
