//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures
//! and traits. All business crates can only depend on this crate, reverse
//! dependencies are prohibited.
//!
//! ## Time Model
//! - Events carry `issued_at` in integer milliseconds since the Unix epoch,
//!   stamped at enqueue.

mod config;
mod error;
mod event;
mod probe;
mod storage;
mod transport;

pub use config::SdkConfig;
pub use error::TelemetryError;
pub use event::{Event, EventDraft, FieldMap, Platform};
pub use probe::{
    no_metadata, no_platform, no_session, MetadataSnapshotFn, PlatformProbe, SessionProbe,
};
pub use storage::{EventStore, LocalEventStore};
pub use transport::{LocalTransport, Transport, TransportResponse};
