//! TelemetryClient - public SDK facade
//!
//! Thin parameter marshalling over the dispatcher core. `track` is legal at
//! any time: before `init` completes (and again after `dispose`) calls are
//! buffered in an ordered deferred-ops list and replayed FIFO once the
//! dispatcher is running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument};

use contracts::{
    no_platform, no_session, EventDraft, EventStore, FieldMap, MetadataSnapshotFn, PlatformProbe,
    SdkConfig, SessionProbe, TelemetryError, Transport,
};
use dispatcher::{DispatchSnapshot, Dispatcher};

use crate::config;
use crate::metadata::MetadataManager;

/// Builder for creating a TelemetryClient
pub struct ClientBuilder<T, S> {
    config: SdkConfig,
    transport: T,
    store: S,
    session_probe: SessionProbe,
    platform_probe: PlatformProbe,
}

impl<T, S> ClientBuilder<T, S>
where
    T: Transport + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
{
    /// Builder with absent session/platform probes.
    pub fn new(config: SdkConfig, transport: T, store: S) -> Self {
        Self {
            config,
            transport,
            store,
            session_probe: no_session(),
            platform_probe: no_platform(),
        }
    }

    /// Install a session probe.
    pub fn session_probe(mut self, probe: SessionProbe) -> Self {
        self.session_probe = probe;
        self
    }

    /// Install a platform probe.
    pub fn platform_probe(mut self, probe: PlatformProbe) -> Self {
        self.platform_probe = probe;
        self
    }

    /// Validate the config and construct the client.
    ///
    /// # Errors
    /// Config validation failure, surfaced synchronously to the caller.
    pub fn build(self) -> Result<TelemetryClient<T, S>, TelemetryError> {
        config::validate(&self.config)?;

        let metadata = Arc::new(MetadataManager::new());
        let snapshot_source = Arc::clone(&metadata);
        let metadata_snapshot: MetadataSnapshotFn = Arc::new(move || snapshot_source.snapshot());

        let dispatcher = Dispatcher::new(
            self.config,
            self.transport,
            self.store,
            metadata_snapshot,
            Arc::clone(&self.session_probe),
            self.platform_probe,
        );

        Ok(TelemetryClient {
            dispatcher,
            metadata,
            session_probe: self.session_probe,
            deferred: Mutex::new(Vec::new()),
        })
    }
}

/// Public SDK facade
pub struct TelemetryClient<T, S> {
    dispatcher: Dispatcher<T, S>,
    metadata: Arc<MetadataManager>,
    session_probe: SessionProbe,
    /// Track calls recorded before the dispatcher is running
    deferred: Mutex<Vec<EventDraft>>,
}

impl<T, S> TelemetryClient<T, S>
where
    T: Transport + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
{
    /// Initialize the pipeline, then replay deferred track calls in their
    /// original order.
    ///
    /// Idempotent while running; legal again after [`dispose`](Self::dispose).
    #[instrument(name = "client_init", skip(self))]
    pub async fn init(&self) -> Result<(), TelemetryError> {
        self.dispatcher.init().await?;
        self.replay_deferred();
        Ok(())
    }

    /// Record an event.
    ///
    /// Never suspends and never fails on lifecycle grounds: while the
    /// dispatcher is not running the call is deferred. Only an empty name
    /// is rejected.
    pub fn track(
        &self,
        name: impl Into<String>,
        payload: Option<FieldMap>,
        metadata: Option<FieldMap>,
    ) -> Result<(), TelemetryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TelemetryError::invalid_event("event name must not be empty"));
        }
        let draft = EventDraft {
            name,
            payload,
            metadata,
        };

        {
            let mut deferred = self.deferred_guard();
            if !self.dispatcher.is_running() || !deferred.is_empty() {
                debug!(name = %draft.name, "dispatcher not ready, deferring event");
                deferred.push(draft);
                return Ok(());
            }
        }

        match self.dispatcher.enqueue(draft.clone()) {
            // disposed between the check and the enqueue; buffer it
            Err(TelemetryError::Lifecycle { .. }) => {
                self.deferred_guard().push(draft);
                Ok(())
            }
            other => other,
        }
    }

    /// Insert or overwrite a global metadata entry. Legal at all times.
    pub fn set_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.set(key, value);
    }

    /// Coherent snapshot of the global metadata. Legal at all times.
    pub fn get_metadata(&self) -> FieldMap {
        self.metadata.snapshot()
    }

    /// The underlying metadata manager.
    pub fn metadata(&self) -> &MetadataManager {
        &self.metadata
    }

    /// Current session identifier from the probe, if any.
    pub fn session_id(&self) -> Option<String> {
        (self.session_probe)()
    }

    /// Complete one flush cycle.
    ///
    /// Before `init` this is a no-op success; after `dispose` it fails with
    /// a lifecycle error until re-init.
    pub async fn flush(&self) -> Result<(), TelemetryError> {
        self.dispatcher.flush().await
    }

    /// Tear the pipeline down. Pending events stay persisted; any in-flight
    /// delivery runs to completion and its outcome is honored. Idempotent.
    pub async fn dispose(&self) {
        self.dispatcher.dispose().await;
    }

    /// Number of events waiting in the in-memory queue.
    pub fn pending_events(&self) -> usize {
        self.dispatcher.queue_len()
    }

    /// Snapshot of dispatch counters.
    pub fn metrics(&self) -> DispatchSnapshot {
        self.dispatcher.metrics()
    }

    fn replay_deferred(&self) {
        // drain under the lock in rounds, so replayed order matches arrival
        // order even against concurrent track calls
        loop {
            let drained: Vec<EventDraft> = {
                let mut deferred = self.deferred_guard();
                if deferred.is_empty() {
                    break;
                }
                deferred.drain(..).collect()
            };
            debug!(count = drained.len(), "replaying deferred events");
            for draft in drained {
                if let Err(e) = self.dispatcher.enqueue(draft) {
                    debug!(error = %e, "deferred event dropped");
                }
            }
        }
    }

    fn deferred_guard(&self) -> MutexGuard<'_, Vec<EventDraft>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
