//! Generic synchronized store

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::{DomainError, UserId};
use crate::reducer::ReduceContext;
use crate::storage::{load_snapshot, LocalStore, RemoteError, RemoteStore, StorageError};
use crate::sync::{EntityFamily, RemoteTaskQueue, SnapshotDebouncer, SyncConfig};

/// Where a store is in fetching its collection from the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Read-only copy of a store's state
#[derive(Debug, Clone, PartialEq)]
pub struct StoreView<S> {
    pub data: S,
    pub status: LoadStatus,
    pub error: Option<String>,
    pub user_id: Option<UserId>,
}

struct StoreState<S> {
    data: S,
    status: LoadStatus,
    error: Option<String>,
    user_id: Option<UserId>,
    /// User whose collection was last fetched successfully
    loaded_for: Option<UserId>,
}

struct StoreInner<F: EntityFamily> {
    family: F,
    state: Mutex<StoreState<F::State>>,
    remote: Arc<dyn RemoteStore>,
    tasks: RemoteTaskQueue,
    snapshots: SnapshotDebouncer<F::State>,
}

impl<F: EntityFamily> StoreInner<F> {
    fn lock(&self) -> MutexGuard<'_, StoreState<F::State>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One entity collection kept in memory and synchronized both ways
///
/// Cloning is cheap and every clone refers to the same collection.
pub struct Store<F: EntityFamily> {
    inner: Arc<StoreInner<F>>,
}

impl<F: EntityFamily> Clone for Store<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: EntityFamily> Store<F> {
    /// Create a store, restoring the last local snapshot if there is one
    pub fn new(
        family: F,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        tasks: RemoteTaskQueue,
        config: &SyncConfig,
    ) -> Self {
        let data = match load_snapshot::<F::State>(local.as_ref(), F::STORAGE_KEY) {
            Ok(Some(data)) => {
                debug!("Restored {} from local snapshot", F::NAME);
                data
            }
            Ok(None) => family.initial(),
            Err(e) => {
                warn!("Ignoring unreadable {} snapshot: {}", F::NAME, e);
                family.initial()
            }
        };

        let snapshots = SnapshotDebouncer::new(F::STORAGE_KEY, config.debounce, local);

        Self {
            inner: Arc::new(StoreInner {
                family,
                state: Mutex::new(StoreState {
                    data,
                    status: LoadStatus::Idle,
                    error: None,
                    user_id: None,
                    loaded_for: None,
                }),
                remote,
                tasks,
                snapshots,
            }),
        }
    }

    pub fn data(&self) -> F::State {
        self.inner.lock().data.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.lock().status
    }

    /// Message of the last failed load, cleared by the next load
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.inner.lock().user_id.clone()
    }

    pub fn view(&self) -> StoreView<F::State> {
        let state = self.inner.lock();
        StoreView {
            data: state.data.clone(),
            status: state.status,
            error: state.error.clone(),
            user_id: state.user_id.clone(),
        }
    }

    /// Queue shared with the other stores of the app
    pub fn tasks(&self) -> &RemoteTaskQueue {
        &self.inner.tasks
    }

    /// Change the signed-in user; `None` switches to offline mode
    pub fn set_user_id(&self, user: Option<UserId>) {
        let mut state = self.inner.lock();
        if state.user_id == user {
            return;
        }
        debug!("{} store user changed to {:?}", F::NAME, user.as_ref().map(UserId::as_str));
        state.user_id = user;
        state.status = LoadStatus::Idle;
        state.error = None;
        state.loaded_for = None;
    }

    /// Apply an action using the system clock
    pub fn dispatch(&self, action: F::Action) -> Result<(), DomainError> {
        self.dispatch_with(action, &ReduceContext::system())
    }

    /// Apply an action with an explicit clock
    ///
    /// A rejected action leaves the collection untouched. An accepted one is
    /// committed, scheduled for the local snapshot and, if a user is signed
    /// in, replicated in the background.
    pub fn dispatch_with(&self, action: F::Action, ctx: &ReduceContext) -> Result<(), DomainError> {
        self.commit(action, ctx, None)
    }

    fn commit(&self, action: F::Action, ctx: &ReduceContext, only_for: Option<&UserId>) -> Result<(), DomainError> {
        let (change, user) = {
            let mut state = self.inner.lock();
            if let Some(expected) = only_for {
                if state.user_id.as_ref() != Some(expected) {
                    debug!("Dropping {} follow-up for signed-out user {}", F::NAME, expected);
                    return Ok(());
                }
            }

            let reduction = F::reduce(&state.data, action, ctx).map_err(|e| {
                debug!("Rejected {} action: {}", F::NAME, e);
                e
            })?;
            state.data = reduction.state;
            // Scheduled under the state lock so snapshots follow commit order
            self.inner.snapshots.schedule(state.data.clone());
            (reduction.change, state.user_id.clone())
        };

        match (change, user) {
            (Some(change), Some(user)) => self.replicate(user, change),
            (Some(_), None) => debug!("Offline, {} change kept locally", F::NAME),
            (None, _) => {}
        }
        Ok(())
    }

    fn replicate(&self, user: UserId, change: F::Change) {
        let operation = self.inner.family.describe(&change);
        let store = self.clone();

        self.inner.tasks.spawn(F::NAME, operation, async move {
            let inner = &store.inner;
            let follow_up = inner.family.push(inner.remote.as_ref(), &user, change).await?;
            if let Some(action) = follow_up {
                if let Err(e) = store.commit(action, &ReduceContext::system(), Some(&user)) {
                    warn!("Could not apply {} follow-up: {}", F::NAME, e);
                }
            }
            Ok(())
        });
    }

    /// Fetch the collection for `user` unless it is already loaded
    ///
    /// Does nothing without a user.
    pub async fn load(&self, user: Option<&UserId>) -> Result<(), RemoteError> {
        let Some(user) = user else {
            return Ok(());
        };

        {
            let state = self.inner.lock();
            if state.status == LoadStatus::Ready && state.loaded_for.as_ref() == Some(user) {
                debug!("{} already loaded for {}", F::NAME, user);
                return Ok(());
            }
        }

        self.reload(user).await
    }

    /// Fetch the collection for `user`, replacing local data on success
    ///
    /// On failure the status becomes `Error` and the data is left as it was.
    pub async fn reload(&self, user: &UserId) -> Result<(), RemoteError> {
        let current = {
            let mut state = self.inner.lock();
            state.user_id = Some(user.clone());
            state.status = LoadStatus::Loading;
            state.error = None;
            state.data.clone()
        };

        info!("Loading {} for user {}", F::NAME, user);
        let result = self
            .inner
            .family
            .fetch(self.inner.remote.as_ref(), user, current)
            .await;

        let mut state = self.inner.lock();
        if state.user_id.as_ref() != Some(user) {
            debug!("Discarding {} load for signed-out user {}", F::NAME, user);
            return Ok(());
        }

        match result {
            Ok(data) => {
                state.data = data;
                state.status = LoadStatus::Ready;
                state.loaded_for = Some(user.clone());
                self.inner.snapshots.schedule(state.data.clone());
                Ok(())
            }
            Err(e) => {
                state.status = LoadStatus::Error;
                state.error = Some(e.to_string());
                error!("Failed to load {}: {}", F::NAME, e);
                Err(e)
            }
        }
    }

    /// Replace the whole collection locally without touching the remote
    pub fn replace(&self, data: F::State) {
        let mut state = self.inner.lock();
        state.data = data;
        self.inner.snapshots.schedule(state.data.clone());
    }

    /// Overwrite the user's remote collection with `data`, waiting for the result
    pub async fn overwrite_remote(&self, user: &UserId, data: &F::State) -> Result<(), RemoteError> {
        self.inner.family.overwrite(self.inner.remote.as_ref(), user, data).await
    }

    /// Write a pending local snapshot now
    pub fn flush(&self) -> Result<bool, StorageError> {
        self.inner.snapshots.flush()
    }

    /// Wait for every queued remote operation to finish
    pub async fn wait_idle(&self) {
        self.inner.tasks.wait_idle().await
    }
}
