//! EventStore trait - pending-event slot storage
//!
//! One SDK instance owns one logical slot. All operations are idempotent.

use crate::{Event, TelemetryError};

/// Pending-event persistence trait
#[trait_variant::make(EventStore: Send)]
pub trait LocalEventStore {
    /// Atomically replace the slot content with `events`.
    ///
    /// Partial writes are forbidden: after `save` returns, the slot holds
    /// either the previous sequence or the new one.
    ///
    /// # Errors
    /// [`TelemetryError::StorageQuota`] when the adapter had to shed oldest
    /// events to fit its quota; the reduced set IS saved, and the error
    /// carries the kept/dropped counts. Any other error means the slot is
    /// unchanged or unknown; the caller's in-memory queue stays
    /// authoritative.
    async fn save(&self, events: &[Event]) -> Result<(), TelemetryError>;

    /// Load the previously saved sequence, or empty when the slot is absent.
    async fn load(&self) -> Result<Vec<Event>, TelemetryError>;

    /// Remove the slot.
    async fn clear(&self) -> Result<(), TelemetryError>;
}
