//! Public library interface for the habit sync engine
//!
//! `HabitApp` owns the four synchronized stores (habits, main diary,
//! settings, achievements), the session and the analytics engine. Actions
//! are applied locally first; persistence to the local cache and to the
//! remote store happens in the background.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

pub mod analytics;
pub mod commands;
pub mod domain;
pub mod reducer;
pub mod session;
pub mod storage;
pub mod sync;
pub mod transfer;

// Re-export public modules and types
pub use analytics::{AnalyticsEngine, DashboardSummary, HabitStats, InsightGenerator, RuleBasedInsights};
pub use domain::*;
pub use reducer::{AchievementAction, DiaryAction, HabitAction, ReduceContext, SettingsAction};
pub use session::{AuthProvider, LocalSession, SessionError, User};
pub use storage::{
    LocalStore, MemoryLocalStore, MemoryRemote, RemoteError, RemoteStore, SqliteLocalStore, SqliteRemote,
    StorageError,
};
pub use sync::{LoadStatus, StoreSet, SyncConfig};
pub use transfer::{ExportDocument, ImportDocument, ImportSummary, TransferError};

/// Errors that can occur while running the app
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Local storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Remote store error: {0}")]
    Remote(#[from] storage::RemoteError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] transfer::TransferError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The habit tracker core
pub struct HabitApp {
    stores: StoreSet,
    auth: Arc<dyn AuthProvider>,
}

impl HabitApp {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            stores: StoreSet::new(local, remote, config),
            auth,
        }
    }

    /// Open the local database at `db_path`
    ///
    /// The remote table store lives in `remote_path` when given, otherwise in
    /// the same file. The session is kept in the local database.
    pub fn open(db_path: PathBuf, remote_path: Option<PathBuf>, config: &SyncConfig) -> Result<Self, AppError> {
        tracing::info!("Opening habit database: {:?}", db_path);

        let local: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::new(db_path.clone())?);
        let remote: Arc<dyn RemoteStore> = Arc::new(SqliteRemote::new(remote_path.unwrap_or(db_path))?);
        let auth: Arc<dyn AuthProvider> = Arc::new(LocalSession::new(local.clone()));

        Ok(Self::new(local, remote, auth, config))
    }

    /// Pick up a persisted session and load the user's data
    ///
    /// Load failures are reported through each store's status, not here.
    pub async fn start(&self) {
        let user = self.auth.current_user();
        let user_id = user.as_ref().map(|u| u.id.clone());
        self.stores.set_user_id(user_id.clone());

        match &user {
            Some(user) => info!("Resuming session for {}", user.email),
            None => info!("No signed-in user, working offline"),
        }

        if let Err(e) = self.stores.load_all(user_id.as_ref()).await {
            warn!("Initial load incomplete: {}", e);
        }
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    /// Sign in and load the user's data from the remote
    pub async fn sign_in(&self, email: &str) -> Result<User, AppError> {
        let user = self.auth.sign_in(email)?;
        self.stores.set_user_id(Some(user.id.clone()));
        if let Err(e) = self.stores.load_all(Some(&user.id)).await {
            warn!("Signed in but loading failed: {}", e);
        }
        Ok(user)
    }

    /// Sign out; later changes stay local
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.stores.wait_idle().await;
        self.auth.sign_out()?;
        self.stores.set_user_id(None);
        Ok(())
    }

    /// Fetch every collection again, if signed in
    pub async fn refresh(&self) -> Result<(), AppError> {
        if let Some(user) = self.stores.habits.user_id() {
            self.stores.reload_all(&user).await?;
        }
        Ok(())
    }

    pub fn analytics(&self) -> AnalyticsEngine {
        AnalyticsEngine::new()
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument::capture(&self.stores)
    }

    pub async fn import(&self, doc: ImportDocument) -> Result<ImportSummary, AppError> {
        Ok(transfer::import(&self.stores, doc).await?)
    }

    /// Parse and import an export file's contents
    pub async fn import_json(&self, json: &str) -> Result<ImportSummary, AppError> {
        let doc = ImportDocument::parse(json)?;
        self.import(doc).await
    }

    /// Wait for queued remote writes and write pending snapshots
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.stores.wait_idle().await;
        self.stores.flush_all()?;
        info!("Habit app shut down cleanly");
        Ok(())
    }
}
