//! # Dispatcher
//!
//! Core event-dispatch engine.
//!
//! Responsibilities:
//! - Buffer tracked events in a bounded FIFO queue
//! - Cut batches from the head and deliver them over the injected transport
//! - Classify outcomes and retry with exponential backoff + jitter
//! - Keep the persisted slot in sync with the pending set

pub mod dispatcher;
pub mod lock;
pub mod metrics;
pub mod queue;
pub mod retry;

pub use contracts::{Event, EventDraft, SdkConfig, TelemetryError};
pub use dispatcher::{Dispatcher, LifecycleState};
pub use lock::{FlushLock, FlushPermit};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use queue::EventQueue;
pub use retry::{backoff_delay, classify_status, RetryClass};
