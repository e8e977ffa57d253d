mod basic_integration;
mod sync_scenarios;
mod transfer_tests;

use std::sync::Arc;

use habit_sync::*;

/// An app over in-memory collaborators
pub struct TestApp {
    pub app: HabitApp,
    pub local: Arc<MemoryLocalStore>,
    pub remote: Arc<MemoryRemote>,
}

pub fn memory_app(remote: Arc<MemoryRemote>) -> TestApp {
    let local = Arc::new(MemoryLocalStore::new());
    let auth = Arc::new(LocalSession::new(local.clone()));
    let app = HabitApp::new(local.clone(), remote.clone(), auth, &SyncConfig::with_debounce_ms(20));
    TestApp { app, local, remote }
}

pub fn add_habit(app: &HabitApp, title: &str, frequency: u32) -> HabitKey {
    let key = HabitKey::new();
    app.stores()
        .habits
        .dispatch(HabitAction::Add {
            key,
            draft: HabitDraft::new(title, frequency),
        })
        .unwrap();
    key
}
