//! Fire-and-forget remote task queue
//!
//! Remote writes run on detached tasks so a dispatch never waits on the
//! network. Outcomes are logged; failures also go to an optional hook. The
//! queue counts tasks in flight so callers that need a barrier (bulk import,
//! shutdown, tests) can wait for it to drain.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::storage::RemoteError;

/// A remote operation that did not succeed
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFailure {
    /// Entity family name, e.g. `habits`
    pub family: &'static str,
    /// Short description of the operation
    pub operation: String,
    pub error: RemoteError,
}

/// Callback invoked for every failed remote operation
pub type FailureHook = Arc<dyn Fn(&RemoteFailure) + Send + Sync>;

#[derive(Default)]
struct QueueInner {
    in_flight: AtomicUsize,
    succeeded: AtomicU64,
    failed: AtomicU64,
    idle: Notify,
    hook: Mutex<Option<FailureHook>>,
}

/// Shared handle to the task queue
#[derive(Clone, Default)]
pub struct RemoteTaskQueue {
    inner: Arc<QueueInner>,
}

impl RemoteTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hook that sees every failure (replaces any previous hook)
    pub fn on_failure(&self, hook: FailureHook) {
        if let Ok(mut slot) = self.inner.hook.lock() {
            *slot = Some(hook);
        }
    }

    /// Run `task` in the background
    ///
    /// Without a tokio runtime there is nowhere to run it, so it is dropped
    /// with a warning; local state is unaffected either way.
    pub fn spawn<T>(&self, family: &'static str, operation: String, task: T)
    where
        T: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, skipping remote {} {}", family, operation);
                return;
            }
        };

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);

        handle.spawn(async move {
            match task.await {
                Ok(()) => {
                    inner.succeeded.fetch_add(1, Ordering::SeqCst);
                    debug!("Remote {} {} succeeded", family, operation);
                }
                Err(e) => {
                    inner.failed.fetch_add(1, Ordering::SeqCst);
                    error!("Remote {} {} failed: {}", family, operation, e);

                    let hook = inner.hook.lock().ok().and_then(|slot| slot.clone());
                    if let Some(hook) = hook {
                        hook(&RemoteFailure {
                            family,
                            operation,
                            error: e,
                        });
                    }
                }
            }

            if inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    /// Number of tasks not yet finished
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn succeeded(&self) -> u64 {
        self.inner.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::SeqCst)
    }

    /// Wait until no task is in flight
    ///
    /// Tasks spawned by finishing tasks (e.g. id assignment follow-ups) are
    /// counted before their parent finishes, so this also waits for them.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
