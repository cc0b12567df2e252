//! FlushLock - single-owner exclusion for flush cycles

use std::sync::{Arc, Mutex, PoisonError};

use contracts::TelemetryError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Serializes flush cycles: at most one holder at a time, not re-entrant.
///
/// Built on a one-permit semaphore. Ownership is an RAII [`FlushPermit`],
/// release is dropping it (a mis-release is unrepresentable), and closing
/// wakes all waiters with an error and rejects further acquisitions. Under a
/// single-threaded runtime this degrades to a latch plus a waiter queue, so
/// the contract holds under both scheduling models.
#[derive(Debug)]
pub struct FlushLock {
    sem: Mutex<Arc<Semaphore>>,
}

/// Proof of flush-lock ownership; dropping it releases the lock.
#[derive(Debug)]
pub struct FlushPermit {
    _permit: OwnedSemaphorePermit,
}

impl FlushLock {
    /// New open lock.
    pub fn new() -> Self {
        Self {
            sem: Mutex::new(Arc::new(Semaphore::new(1))),
        }
    }

    /// Suspend until ownership is granted.
    ///
    /// # Errors
    /// The lock has been closed by [`close`](Self::close).
    pub async fn acquire(&self) -> Result<FlushPermit, TelemetryError> {
        let sem = self.current();
        match sem.acquire_owned().await {
            Ok(permit) => Ok(FlushPermit { _permit: permit }),
            Err(_) => Err(TelemetryError::lifecycle("flush lock is closed")),
        }
    }

    /// Immediate attempt; `None` when the lock is held or closed.
    pub fn try_acquire(&self) -> Option<FlushPermit> {
        self.current()
            .try_acquire_owned()
            .ok()
            .map(|permit| FlushPermit { _permit: permit })
    }

    /// Reject all further acquisitions and wake pending waiters (dispose).
    pub fn close(&self) {
        self.current().close();
    }

    /// Install a fresh open lock (re-initialization after dispose).
    pub fn reset(&self) {
        let mut sem = self.sem.lock().unwrap_or_else(PoisonError::into_inner);
        *sem = Arc::new(Semaphore::new(1));
    }

    fn current(&self) -> Arc<Semaphore> {
        Arc::clone(&self.sem.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for FlushLock {
    fn default() -> Self {
        Self::new()
    }
}
