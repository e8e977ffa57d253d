/// Basic integration tests against SQLite files
use habit_sync::*;
use tempfile::tempdir;

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_data_survives_restart() {
        let dir = tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("habits.db");

        {
            let app = HabitApp::open(db_path.clone(), None, &SyncConfig::default()).unwrap();
            app.start().await;
            crate::add_habit(&app, "Read", 1);
            app.shutdown().await.unwrap();
        }

        let app = HabitApp::open(db_path, None, &SyncConfig::default()).unwrap();
        app.start().await;
        let habits = app.stores().habits.data();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].title, "Read");
        assert!(habits[0].id.is_none());
    }

    #[tokio::test]
    async fn test_signed_in_session_keeps_keys_across_restart() {
        let dir = tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("habits.db");
        let remote_path = dir.path().join("remote.db");

        let key = {
            let app = HabitApp::open(db_path.clone(), Some(remote_path.clone()), &SyncConfig::default()).unwrap();
            app.start().await;
            app.sign_in("ada@example.com").await.unwrap();
            let key = crate::add_habit(&app, "Read", 1);
            app.shutdown().await.unwrap();
            key
        };

        let app = HabitApp::open(db_path, Some(remote_path), &SyncConfig::default()).unwrap();
        app.start().await;

        assert_eq!(app.current_user().map(|u| u.email), Some("ada@example.com".to_string()));
        assert_eq!(app.stores().habits.status(), LoadStatus::Ready);
        let habits = app.stores().habits.data();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].key, key);
        assert!(habits[0].id.is_some());
    }

    #[tokio::test]
    async fn test_remote_file_shared_between_devices() {
        let dir = tempdir().expect("Failed to create temp dir");
        let remote_path = dir.path().join("remote.db");

        let first = HabitApp::open(dir.path().join("one.db"), Some(remote_path.clone()), &SyncConfig::default()).unwrap();
        first.sign_in("ada@example.com").await.unwrap();
        crate::add_habit(&first, "Read", 1);
        first.shutdown().await.unwrap();

        let second = HabitApp::open(dir.path().join("two.db"), Some(remote_path), &SyncConfig::default()).unwrap();
        second.sign_in("ada@example.com").await.unwrap();
        let habits = second.stores().habits.data();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].title, "Read");
    }
}
