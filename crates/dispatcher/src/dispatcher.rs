//! Dispatcher - buffered, batched, retrying, persisted event pipeline
//!
//! Owns the event lifecycle from enqueue to acknowledged delivery (or
//! terminal drop): batching, the single in-flight flush, the periodic flush
//! ticker, backoff retries and persistence sync.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Event, EventDraft, EventStore, MetadataSnapshotFn, PlatformProbe, SdkConfig, SessionProbe,
    TelemetryError, Transport,
};

use crate::lock::FlushLock;
use crate::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::queue::EventQueue;
use crate::retry::{backoff_delay, classify_status, RetryClass};

/// Dispatcher lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Flushing,
    Disposed,
}

/// The core coordinator of the telemetry pipeline.
///
/// Cheap to clone (shared internals); generic over the injected transport
/// and persistence adapters.
pub struct Dispatcher<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for Dispatcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T, S> {
    config: SdkConfig,
    transport: T,
    store: S,
    queue: EventQueue,
    state: Mutex<LifecycleState>,
    flush_lock: FlushLock,
    /// Completed flush cycles. A caller that waited behind an in-flight
    /// flush compares this before and after acquiring the lock and returns
    /// without starting another cycle.
    flush_generation: AtomicU64,
    /// Serializes store access; `save` calls never overlap.
    store_lock: tokio::sync::Mutex<()>,
    /// Wakes the store-sync worker after queue mutations.
    sync_signal: Notify,
    /// Runtime captured at init; lets the synchronous enqueue path spawn
    /// its threshold flush from any thread.
    runtime: Mutex<Option<tokio::runtime::Handle>>,
    tasks: Mutex<BackgroundTasks>,
    metrics: DispatchMetrics,
    metadata_snapshot: MetadataSnapshotFn,
    session_probe: SessionProbe,
    platform_probe: PlatformProbe,
    headers: HashMap<String, String>,
}

#[derive(Default)]
struct BackgroundTasks {
    ticker: Option<JoinHandle<()>>,
    syncer: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl<T, S> Dispatcher<T, S>
where
    T: Transport + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
{
    /// Create an uninitialized dispatcher.
    ///
    /// `metadata_snapshot`, `session_probe` and `platform_probe` are the
    /// ambient-context capabilities sampled at every enqueue.
    pub fn new(
        config: SdkConfig,
        transport: T,
        store: S,
        metadata_snapshot: MetadataSnapshotFn,
        session_probe: SessionProbe,
        platform_probe: PlatformProbe,
    ) -> Self {
        let headers = HashMap::from([(config.api_key_header.clone(), config.api_key.clone())]);
        let queue = EventQueue::new(config.max_buffer_size);

        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                queue,
                state: Mutex::new(LifecycleState::Uninitialized),
                flush_lock: FlushLock::new(),
                flush_generation: AtomicU64::new(0),
                store_lock: tokio::sync::Mutex::new(()),
                sync_signal: Notify::new(),
                runtime: Mutex::new(None),
                tasks: Mutex::new(BackgroundTasks::default()),
                metrics: DispatchMetrics::new(),
                metadata_snapshot,
                session_probe,
                platform_probe,
                headers,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.inner.state_guard()
    }

    /// Whether enqueue/flush are currently accepted.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Running | LifecycleState::Flushing
        )
    }

    /// Number of pending events.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Snapshot of dispatch counters.
    pub fn metrics(&self) -> DispatchSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Initialize: load the persisted slot, start the flush ticker and the
    /// store-sync worker, then accept traffic.
    ///
    /// Idempotent while running; an `init` during `Initializing` is an
    /// error; legal again after [`dispose`](Self::dispose).
    #[instrument(name = "dispatcher_init", skip(self))]
    pub async fn init(&self) -> Result<(), TelemetryError> {
        {
            let mut state = self.inner.state_guard();
            match *state {
                LifecycleState::Running | LifecycleState::Flushing => {
                    debug!("init while running, no-op");
                    return Ok(());
                }
                LifecycleState::Initializing => {
                    return Err(TelemetryError::lifecycle("init already in progress"));
                }
                LifecycleState::Uninitialized | LifecycleState::Disposed => {
                    *state = LifecycleState::Initializing;
                }
            }
        }

        self.inner.flush_lock.reset();

        if let Some(max_buffer) = self.inner.config.max_buffer_size {
            if max_buffer < self.inner.config.max_batch_size {
                warn!(
                    max_buffer_size = max_buffer,
                    max_batch_size = self.inner.config.max_batch_size,
                    "buffer smaller than batch, batch size can never be reached"
                );
            }
        }

        let mut loaded = {
            let _guard = self.inner.store_lock.lock().await;
            match self.inner.store.load().await {
                Ok(events) => events,
                Err(e) => {
                    error!(error = %e, "failed to load persisted events, starting empty");
                    Vec::new()
                }
            }
        };
        if let Some(max) = self.inner.config.max_buffer_size {
            if loaded.len() > max {
                let excess = loaded.len() - max;
                loaded.drain(..excess);
                warn!(dropped = excess, "persisted events exceed buffer, oldest evicted");
                self.inner.metrics.record_overflow(excess);
            }
        }
        let restored = loaded.len();
        for event in loaded {
            self.inner.queue.push(event);
        }
        self.inner.metrics.record_depth(self.inner.queue.len());
        if restored > 0 {
            info!(restored, "restored persisted events");
        }

        *self
            .inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tokio::runtime::Handle::current());

        self.spawn_ticker();
        self.spawn_syncer();

        *self.inner.state_guard() = LifecycleState::Running;
        info!(
            flush_interval_ms = self.inner.config.flush_interval_ms,
            max_batch_size = self.inner.config.max_batch_size,
            "dispatcher running"
        );
        Ok(())
    }

    /// Build an event from the draft plus the ambient snapshots, then
    /// buffer it.
    ///
    /// Never suspends: the batch-threshold flush and the persistence sync
    /// both happen off the caller's stack.
    pub fn enqueue(&self, draft: EventDraft) -> Result<(), TelemetryError> {
        if !self.is_running() {
            return Err(TelemetryError::lifecycle(format!(
                "enqueue on {:?} dispatcher",
                self.state()
            )));
        }
        if draft.name.is_empty() {
            return Err(TelemetryError::invalid_event("event name must not be empty"));
        }

        let event = self.inner.build_event(draft);
        debug!(name = %event.name, "event enqueued");

        let dropped = self.inner.queue.push(event);
        self.inner
            .metrics
            .record_enqueue(self.inner.queue.len(), dropped);
        self.inner.sync_signal.notify_one();

        if self.inner.queue.len() >= self.inner.config.max_batch_size {
            let runtime = self
                .inner
                .runtime
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(runtime) = runtime {
                let this = self.clone();
                runtime.spawn(async move {
                    if let Err(e) = this.flush().await {
                        debug!(error = %e, "batch-threshold flush skipped");
                    }
                });
            }
        }
        Ok(())
    }

    /// Run one flush cycle.
    ///
    /// Callers that waited behind an in-flight flush return once it
    /// completes, without starting another cycle; two concurrent triggers
    /// therefore never produce overlapping transport requests.
    #[instrument(name = "dispatcher_flush", skip(self))]
    pub async fn flush(&self) -> Result<(), TelemetryError> {
        match self.state() {
            LifecycleState::Running | LifecycleState::Flushing => {}
            LifecycleState::Uninitialized | LifecycleState::Initializing => return Ok(()),
            LifecycleState::Disposed => {
                return Err(TelemetryError::lifecycle("flush on disposed dispatcher"));
            }
        }

        let generation = self.inner.flush_generation.load(Ordering::Acquire);
        let _permit = self.inner.flush_lock.acquire().await?;
        if self.inner.flush_generation.load(Ordering::Acquire) != generation {
            debug!("satisfied by the flush that just completed");
            return Ok(());
        }

        let result = self.flush_cycle().await;
        self.inner.flush_generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Stop scheduled work, drain any in-flight flush (its outcome is
    /// honored for persistence), clear the in-memory queue and reject
    /// further operations.
    ///
    /// The persisted slot is deliberately left in place so pending events
    /// survive process exit. A fresh [`init`](Self::init) is legal
    /// afterwards. Idempotent.
    #[instrument(name = "dispatcher_dispose", skip(self))]
    pub async fn dispose(&self) {
        if self.state() == LifecycleState::Disposed {
            debug!("already disposed");
            return;
        }

        let (ticker, syncer, retry) = {
            let mut tasks = self.inner.tasks_guard();
            (tasks.ticker.take(), tasks.syncer.take(), tasks.retry.take())
        };
        for handle in [ticker, syncer, retry].into_iter().flatten() {
            handle.abort();
        }

        // Drain the in-flight flush, if any; an Err means the lock was
        // already closed by a racing dispose.
        let permit = self.inner.flush_lock.acquire().await;
        *self.inner.state_guard() = LifecycleState::Disposed;
        self.inner.queue.clear();
        self.inner.metrics.record_depth(0);
        drop(permit);
        self.inner.flush_lock.close();

        info!("dispatcher disposed");
    }

    async fn flush_cycle(&self) -> Result<(), TelemetryError> {
        {
            let mut state = self.inner.state_guard();
            match *state {
                LifecycleState::Running | LifecycleState::Flushing => {
                    *state = LifecycleState::Flushing;
                }
                // disposed while we waited for the lock
                _ => return Ok(()),
            }
        }

        let batch = self.inner.queue.take_batch(self.inner.config.max_batch_size);
        self.inner.metrics.record_depth(self.inner.queue.len());
        if batch.is_empty() {
            self.finish_cycle();
            return Ok(());
        }

        debug!(batch_len = batch.len(), "delivering batch");
        self.inner.sync_store().await;

        let outcome = self
            .inner
            .transport
            .send(&batch, &self.inner.config.endpoint, &self.inner.headers)
            .await;

        match outcome {
            Ok(response) => match classify_status(response.status) {
                RetryClass::Success => {
                    debug!(sent = batch.len(), status = response.status, "batch acknowledged");
                    self.inner.metrics.record_delivery(batch.len());
                }
                RetryClass::Terminal => {
                    warn!(
                        dropped = batch.len(),
                        status = response.status,
                        "batch rejected, dropping without retry"
                    );
                    self.inner.metrics.record_rejection(batch.len());
                }
                RetryClass::Retryable => {
                    warn!(status = response.status, "server error, requeueing batch");
                    self.requeue(batch).await;
                }
            },
            Err(e) => {
                warn!(error = %e, "transport failed, requeueing batch");
                self.requeue(batch).await;
            }
        }

        self.finish_cycle();
        Ok(())
    }

    /// Retryable failure path: bump per-event attempt counters, drop
    /// exhausted events, requeue the survivors at the head and schedule a
    /// delayed retry.
    async fn requeue(&self, batch: Vec<Event>) {
        let max_retries = self.inner.config.max_retries;
        let mut survivors = Vec::with_capacity(batch.len());
        let mut exhausted = 0usize;
        for mut event in batch {
            event.attempts += 1;
            if event.attempts > max_retries {
                exhausted += 1;
            } else {
                survivors.push(event);
            }
        }
        if exhausted > 0 {
            warn!(dropped = exhausted, max_retries, "retry budget exhausted, dropping");
        }
        self.inner.metrics.record_requeue(exhausted);
        if survivors.is_empty() {
            self.inner.sync_store().await;
            return;
        }

        // retry ordinal: failures so far, zero-based, most-retried governs
        let attempt = survivors.iter().map(|e| e.attempts).max().unwrap_or(1) - 1;

        let dropped = self.inner.queue.prepend(survivors);
        self.inner.metrics.record_overflow(dropped);
        self.inner.metrics.record_depth(self.inner.queue.len());
        self.inner.sync_store().await;
        self.schedule_retry(attempt);
    }

    fn schedule_retry(&self, attempt: u32) {
        let delay = backoff_delay(attempt);
        self.inner
            .metrics
            .record_retry_scheduled(attempt, delay.as_millis() as u64);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "retry scheduled");

        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = this.flush().await {
                debug!(error = %e, "retry flush skipped");
            }
        });

        let mut tasks = self.inner.tasks_guard();
        // a fresh failure supersedes a pending retry
        if let Some(old) = tasks.retry.replace(handle) {
            old.abort();
        }
    }

    fn finish_cycle(&self) {
        let mut state = self.inner.state_guard();
        if *state == LifecycleState::Flushing {
            *state = LifecycleState::Running;
        }
    }

    fn spawn_ticker(&self) {
        let this = self.clone();
        let period = self.inner.config.flush_interval();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first interval tick fires immediately; skip it so the
            // first scheduled flush lands one full period after init
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = this.flush().await {
                    debug!(error = %e, "scheduled flush skipped");
                }
            }
        });

        let mut tasks = self.inner.tasks_guard();
        if let Some(old) = tasks.ticker.replace(handle) {
            old.abort();
        }
    }

    fn spawn_syncer(&self) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                this.inner.sync_signal.notified().await;
                this.inner.sync_store().await;
            }
        });

        let mut tasks = self.inner.tasks_guard();
        if let Some(old) = tasks.syncer.replace(handle) {
            old.abort();
        }
    }
}

impl<T, S> Inner<T, S>
where
    T: Transport + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
{
    fn build_event(&self, draft: EventDraft) -> Event {
        let mut metadata = (self.metadata_snapshot)();
        if let Some(overrides) = draft.metadata {
            metadata.extend(overrides);
        }

        Event {
            name: draft.name,
            payload: draft.payload,
            issued_at: now_millis(),
            session_id: (self.session_probe)(),
            metadata,
            platform: (self.platform_probe)(),
            attempts: 0,
        }
    }

    /// Persist a coherent snapshot of the pending set.
    ///
    /// Quota errors are accepted (the adapter saved a reduced set); on any
    /// other error the in-memory queue stays authoritative until the next
    /// sync.
    async fn sync_store(&self) {
        let _guard = self.store_lock.lock().await;
        let snapshot = self.queue.snapshot();

        let result = if snapshot.is_empty() {
            self.store.clear().await
        } else {
            self.store.save(&snapshot).await
        };

        match result {
            Ok(()) => {}
            Err(TelemetryError::StorageQuota { saved, dropped }) => {
                warn!(saved, dropped, "storage quota hit, oldest pending events not persisted");
            }
            Err(e) => {
                error!(error = %e, "failed to persist pending events");
            }
        }
    }
}

impl<T, S> Inner<T, S> {
    fn state_guard(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks_guard(&self) -> MutexGuard<'_, BackgroundTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
