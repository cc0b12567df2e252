//! Runtime probes - ambient context as injected capabilities
//!
//! Session and platform detection are provided as function references rather
//! than baked into the core, so the same dispatcher serves browser, mobile
//! and server runtimes. Uses `Arc` to allow sharing across tasks.

use std::sync::Arc;

use crate::{FieldMap, Platform};

/// Returns the current session identifier, if the runtime has one.
pub type SessionProbe = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Returns a snapshot of the host platform.
pub type PlatformProbe = Arc<dyn Fn() -> Option<Platform> + Send + Sync>;

/// Returns a coherent point-in-time snapshot of the global metadata map.
pub type MetadataSnapshotFn = Arc<dyn Fn() -> FieldMap + Send + Sync>;

/// Probe for runtimes without sessions.
pub fn no_session() -> SessionProbe {
    Arc::new(|| None)
}

/// Probe for runtimes without platform detection.
pub fn no_platform() -> PlatformProbe {
    Arc::new(|| None)
}

/// Snapshot provider for dispatchers without a metadata manager.
pub fn no_metadata() -> MetadataSnapshotFn {
    Arc::new(FieldMap::new)
}
