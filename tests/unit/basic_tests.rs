/// Basic unit tests to verify core functionality
use habit_sync::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    #[test]
    fn test_habit_creation() {
        let draft = HabitDraft::new("Test Habit", 2).with_color(3).with_icon("book");
        assert!(draft.validate().is_ok());

        let habit = Habit::from_draft(draft, HabitKey::new(), now_millis());
        assert_eq!(habit.title, "Test Habit");
        assert_eq!(habit.frequency, 2);
        assert!(habit.completed_days.is_empty());
        assert!(!habit.is_synced());
    }

    #[test]
    fn test_draft_parse_rejects_bad_input() {
        assert!(matches!(
            HabitDraft::parse("Read", "0", "", "often"),
            Err(DomainError::InvalidFrequency(_))
        ));
        assert!(matches!(
            HabitDraft::parse("   ", "0", "", "1").unwrap().validate(),
            Err(DomainError::InvalidHabitName(_))
        ));
        assert!(HabitDraft::parse("Read", "2", "book", " 3 ").is_ok());
    }

    #[test]
    fn test_diary_entry_creation() {
        let date = parse_timestamp("2024-06-15T08:30:00+02:00").unwrap();
        let entry = DiaryEntry::new(date, "Felt great").unwrap();

        assert_eq!(entry.id, None);
        assert_eq!(canonical_timestamp(&entry.date), "2024-06-15T06:30:00.000Z");
        assert!(entry.created_at(&parse_timestamp("2024-06-15T06:30:00Z").unwrap()));
    }

    #[test]
    fn test_storage_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let local = SqliteLocalStore::new(temp_file.path().to_path_buf());
        assert!(local.is_ok());

        let remote = SqliteRemote::new(temp_file.path().to_path_buf());
        assert!(remote.is_ok());
    }

    #[tokio::test]
    async fn test_app_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let app = HabitApp::open(temp_file.path().to_path_buf(), None, &SyncConfig::default());
        assert!(app.is_ok());

        let app = app.unwrap();
        app.start().await;
        assert!(app.current_user().is_none());
        assert!(app.stores().habits.data().is_empty());
    }

    #[test]
    fn test_sync_config_default() {
        assert_eq!(SyncConfig::default().debounce, std::time::Duration::from_millis(1000));
    }
}
