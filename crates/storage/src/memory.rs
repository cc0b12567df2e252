//! MemoryStore - in-memory slot for tests and ephemeral runtimes
//!
//! Mock-grade store with quota semantics matching [`FileStore`](crate::FileStore)
//! plus failure injection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{Event, EventStore, TelemetryError};

struct MemoryStoreInner {
    slot: Mutex<Vec<Event>>,
    max_events: Option<usize>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    save_count: AtomicU64,
}

/// In-memory slot store
///
/// Internal state wrapped in Arc, supports Clone: keep one handle for
/// assertions while the dispatcher owns another.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Store bounded to `max_events` persisted events.
    pub fn with_quota(max_events: usize) -> Self {
        Self::with_capacity(Some(max_events))
    }

    fn with_capacity(max_events: Option<usize>) -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                slot: Mutex::new(Vec::new()),
                max_events,
                fail_saves: AtomicBool::new(false),
                fail_loads: AtomicBool::new(false),
                save_count: AtomicU64::new(0),
            }),
        }
    }

    /// Make subsequent `save` calls fail (non-quota storage error).
    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `load` calls fail.
    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Preload the slot (simulates a previous process run).
    pub fn seed(&self, events: Vec<Event>) {
        *lock(&self.inner.slot) = events;
    }

    /// Current slot content.
    pub fn pending(&self) -> Vec<Event> {
        lock(&self.inner.slot).clone()
    }

    /// Names of the current slot content.
    pub fn pending_names(&self) -> Vec<String> {
        lock(&self.inner.slot).iter().map(|e| e.name.clone()).collect()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u64 {
        self.inner.save_count.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryStore {
    async fn save(&self, events: &[Event]) -> Result<(), TelemetryError> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(TelemetryError::storage("injected save failure"));
        }
        self.inner.save_count.fetch_add(1, Ordering::SeqCst);

        match self.inner.max_events {
            Some(max) if events.len() > max => {
                let dropped = events.len() - max;
                *lock(&self.inner.slot) = events[dropped..].to_vec();
                Err(TelemetryError::StorageQuota {
                    saved: events.len() - dropped,
                    dropped,
                })
            }
            _ => {
                *lock(&self.inner.slot) = events.to_vec();
                Ok(())
            }
        }
    }

    async fn load(&self) -> Result<Vec<Event>, TelemetryError> {
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(TelemetryError::storage("injected load failure"));
        }
        Ok(lock(&self.inner.slot).clone())
    }

    async fn clear(&self) -> Result<(), TelemetryError> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(TelemetryError::storage("injected clear failure"));
        }
        lock(&self.inner.slot).clear();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
