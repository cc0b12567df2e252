//! # Transport
//!
//! Transport adapters for the dispatch engine.
//!
//! Responsibilities:
//! - Serialize batches and deliver them to the collector
//! - Surface connection-level failures as errors, server rejections as
//!   statuses (the dispatcher classifies both)

pub mod http;
pub mod mock;

pub use contracts::{Transport, TransportResponse};
pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};
