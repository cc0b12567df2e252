//! Dispatch counters
//!
//! The pipeline's own view of its lifecycle: what entered the queue, what
//! the collector acknowledged, what was shed and why. Each recording method
//! mirrors one dispatcher decision point and also publishes through the
//! `metrics` facade, so a host that installs a recorder (see the
//! observability crate) reads the same numbers `snapshot()` reports.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use metrics::{counter, gauge, histogram};

/// Cumulative counters for one dispatcher.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    queue_depth: AtomicUsize,
    enqueued: AtomicU64,
    delivered: AtomicU64,
    dropped_overflow: AtomicU64,
    dropped_terminal: AtomicU64,
    delivery_failures: AtomicU64,
    retries_scheduled: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One event accepted; `evicted` oldest events fell off the buffer cap
    /// to make room.
    pub fn record_enqueue(&self, depth: usize, evicted: usize) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        counter!("telemetry_sdk_events_enqueued_total").increment(1);
        self.record_overflow(evicted);
        self.record_depth(depth);
    }

    /// Buffer-cap eviction outside the enqueue path (slot restore, requeue).
    pub fn record_overflow(&self, evicted: usize) {
        if evicted > 0 {
            self.dropped_overflow
                .fetch_add(evicted as u64, Ordering::Relaxed);
            counter!("telemetry_sdk_events_dropped_total", "reason" => "overflow")
                .increment(evicted as u64);
        }
    }

    /// Collector acknowledged a batch.
    pub fn record_delivery(&self, batch_len: usize) {
        self.delivered.fetch_add(batch_len as u64, Ordering::Relaxed);
        counter!("telemetry_sdk_events_delivered_total").increment(batch_len as u64);
        histogram!("telemetry_sdk_batch_size").record(batch_len as f64);
    }

    /// Collector rejected a batch outright (4xx): terminal drop, no retry.
    pub fn record_rejection(&self, batch_len: usize) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        self.dropped_terminal
            .fetch_add(batch_len as u64, Ordering::Relaxed);
        counter!("telemetry_sdk_events_dropped_total", "reason" => "rejected")
            .increment(batch_len as u64);
    }

    /// Delivery failed retryably; `exhausted` events ran out of retry
    /// budget and were dropped instead of requeued.
    pub fn record_requeue(&self, exhausted: usize) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        if exhausted > 0 {
            self.dropped_terminal
                .fetch_add(exhausted as u64, Ordering::Relaxed);
            counter!("telemetry_sdk_events_dropped_total", "reason" => "retries_exhausted")
                .increment(exhausted as u64);
        }
    }

    /// A delayed retry flush was scheduled at the given backoff ordinal.
    pub fn record_retry_scheduled(&self, attempt: u32, delay_ms: u64) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
        counter!("telemetry_sdk_retries_scheduled_total").increment(1);
        gauge!("telemetry_sdk_retry_attempt").set(attempt as f64);
        histogram!("telemetry_sdk_retry_delay_ms").record(delay_ms as f64);
    }

    /// Current pending-queue depth.
    pub fn record_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
        gauge!("telemetry_sdk_queue_depth").set(depth as f64);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            dropped_terminal: self.dropped_terminal.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch counters (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct DispatchSnapshot {
    pub queue_depth: usize,
    pub enqueued: u64,
    pub delivered: u64,
    pub dropped_overflow: u64,
    pub dropped_terminal: u64,
    pub delivery_failures: u64,
    pub retries_scheduled: u64,
}
