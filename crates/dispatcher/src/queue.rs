//! EventQueue - bounded in-memory FIFO of pending events

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::Event;
use tracing::warn;

/// Bounded ordered buffer of pending events.
///
/// Insertion order equals intended send order. Overflow evicts from the
/// head, except on the requeue path where eviction comes from the tail so
/// retry events survive as long as any event survives.
///
/// All operations are atomic; interior references never escape.
#[derive(Debug)]
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    max_size: Option<usize>,
}

impl EventQueue {
    /// Create a queue with the given capacity; `None` = unbounded.
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            max_size,
        }
    }

    /// Append to the tail, evicting from the head while over capacity.
    ///
    /// Returns the number of evicted events; evictions are logged once per
    /// call with the aggregated count.
    pub fn push(&self, event: Event) -> usize {
        let mut queue = self.lock();
        queue.push_back(event);

        let mut dropped = 0;
        if let Some(max) = self.max_size {
            while queue.len() > max {
                queue.pop_front();
                dropped += 1;
            }
        }
        drop(queue);

        if dropped > 0 {
            warn!(dropped, "buffer full, oldest events evicted");
        }
        dropped
    }

    /// Remove and return up to the first `n` events, in order.
    pub fn take_batch(&self, n: usize) -> Vec<Event> {
        let mut queue = self.lock();
        let n = n.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Reinsert a batch at the head, preserving its relative order.
    ///
    /// Requeue path: after this call the given events occupy indices
    /// `[0, events.len())`. When the combined length exceeds capacity,
    /// eviction comes from the tail, so requeued events outlive anything
    /// enqueued after them. Returns the number of evicted events.
    pub fn prepend(&self, events: Vec<Event>) -> usize {
        let mut queue = self.lock();
        for event in events.into_iter().rev() {
            queue.push_front(event);
        }

        let dropped = match self.max_size {
            Some(max) if queue.len() > max => {
                let excess = queue.len() - max;
                queue.truncate(max);
                excess
            }
            _ => 0,
        };
        drop(queue);

        if dropped > 0 {
            warn!(dropped, "buffer full, newest events evicted after requeue");
        }
        dropped
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all pending events (in memory only).
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clone of the current content, for persistence.
    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
