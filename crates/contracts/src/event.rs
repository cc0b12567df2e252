//! Event - the unit of telemetry
//!
//! Built by the dispatcher at enqueue time from an [`EventDraft`] plus the
//! ambient snapshots (metadata, session, platform).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arbitrary serializable values keyed by name (payloads and metadata).
pub type FieldMap = HashMap<String, serde_json::Value>;

/// Runtime platform of the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Platform {
    /// Browser runtime
    Web {
        browser: String,
        device: String,
        os: String,
    },
    /// Mobile / desktop native runtime
    Native { device: String, os: String },
    /// Server-side runtime
    Server,
}

/// A tracked telemetry event.
///
/// Immutable once built: `issued_at`, `session_id`, `platform` and `metadata`
/// are the snapshots observable at the instant of enqueue. Subsequent
/// metadata mutations never change an already-queued event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name (non-empty)
    pub name: String,

    /// Caller-supplied payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<FieldMap>,

    /// Milliseconds since Unix epoch, stamped at enqueue
    pub issued_at: u64,

    /// Session identifier (runtime-dependent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Global metadata snapshot merged with per-call overrides
    #[serde(default)]
    pub metadata: FieldMap,

    /// Host platform snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Delivery attempt counter. Internal: never serialized, so a process
    /// restart resets it.
    #[serde(skip)]
    pub attempts: u32,
}

/// Track-time input from which the dispatcher builds an [`Event`].
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    /// Event name (non-empty)
    pub name: String,
    /// Caller-supplied payload
    pub payload: Option<FieldMap>,
    /// Per-call metadata overrides; win over the global snapshot
    pub metadata: Option<FieldMap>,
}

impl EventDraft {
    /// Draft with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            metadata: None,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: FieldMap) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach per-call metadata overrides.
    pub fn with_metadata(mut self, metadata: FieldMap) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
