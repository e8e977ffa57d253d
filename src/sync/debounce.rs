//! Debounced local snapshots
//!
//! Each store persists its whole collection to the local cache, but only
//! after a quiet period: every new value restarts the timer and the write
//! uses whatever value is pending when the timer fires.
//!
//! Writes happen under the slot lock, so values reach the local store in the
//! order they were scheduled.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::storage::{save_snapshot, LocalStore, StorageError};

struct Slot<T> {
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
}

/// Coalesces snapshot writes for one local key
///
/// Dropping the debouncer writes any pending value.
pub struct SnapshotDebouncer<T: Serialize + Send + 'static> {
    key: &'static str,
    window: Duration,
    local: Arc<dyn LocalStore>,
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SnapshotDebouncer<T>
where
    T: Serialize + Send + 'static,
{
    pub fn new(key: &'static str, window: Duration, local: Arc<dyn LocalStore>) -> Self {
        Self {
            key,
            window,
            local,
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                timer: None,
            })),
        }
    }

    /// Replace the pending value and restart the quiet period
    ///
    /// With a zero window, or outside a tokio runtime, the value is written
    /// immediately.
    pub fn schedule(&self, value: T) {
        let runtime = tokio::runtime::Handle::try_current().ok();
        let mut slot = lock(&self.slot);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let runtime = match runtime {
            Some(runtime) if !self.window.is_zero() => runtime,
            _ => {
                slot.pending = None;
                write(self.local.as_ref(), self.key, &value);
                return;
            }
        };

        slot.pending = Some(value);

        let window = self.window;
        let key = self.key;
        let local = Arc::clone(&self.local);
        let shared = Arc::clone(&self.slot);
        slot.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let mut slot = lock(&shared);
            slot.timer = None;
            if let Some(value) = slot.pending.take() {
                write(local.as_ref(), key, &value);
            }
        }));
    }

    /// Whether a write is waiting for its timer
    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    /// Write the pending value now, if any
    ///
    /// Returns whether something was written.
    pub fn flush(&self) -> Result<bool, StorageError> {
        let mut slot = lock(&self.slot);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        match slot.pending.take() {
            Some(value) => {
                save_snapshot(self.local.as_ref(), self.key, &value)?;
                debug!("Flushed snapshot '{}'", self.key);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T: Serialize + Send + 'static> Drop for SnapshotDebouncer<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("Failed to save snapshot '{}' on shutdown: {}", self.key, e);
        }
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Snapshot failures never reach the caller; the in-memory state stays authoritative
fn write<T: Serialize>(local: &dyn LocalStore, key: &str, value: &T) {
    match save_snapshot(local, key, value) {
        Ok(()) => debug!("Saved snapshot '{}'", key),
        Err(e) => error!("Failed to save snapshot '{}': {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_snapshot, MemoryLocalStore};

    fn debouncer(window_ms: u64) -> (Arc<MemoryLocalStore>, SnapshotDebouncer<Vec<u32>>) {
        let local = Arc::new(MemoryLocalStore::new());
        let debouncer = SnapshotDebouncer::new("numbers", Duration::from_millis(window_ms), local.clone());
        (local, debouncer)
    }

    #[tokio::test]
    async fn test_burst_collapses_to_one_write() {
        let (local, debouncer) = debouncer(30);

        for n in 1..=5 {
            debouncer.schedule((1..=n).collect());
        }
        assert!(debouncer.is_pending());
        assert_eq!(local.write_count("numbers"), 0);

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(local.write_count("numbers"), 1);
        let saved: Vec<u32> = load_snapshot(local.as_ref(), "numbers").unwrap().unwrap();
        assert_eq!(saved, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let (local, debouncer) = debouncer(10_000);

        debouncer.schedule(vec![7]);
        assert!(debouncer.flush().unwrap());
        assert_eq!(local.write_count("numbers"), 1);

        // Nothing left to write
        assert!(!debouncer.flush().unwrap());
        assert_eq!(local.write_count("numbers"), 1);
    }

    #[test]
    fn test_without_runtime_writes_synchronously() {
        let (local, debouncer) = debouncer(30);
        debouncer.schedule(vec![1, 2]);
        assert_eq!(local.write_count("numbers"), 1);
        assert!(!debouncer.is_pending());
    }
}
