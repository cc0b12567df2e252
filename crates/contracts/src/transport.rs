//! Transport trait - batch delivery interface
//!
//! Defines the abstract interface for transport adapters.

use std::collections::HashMap;

use crate::{Event, TelemetryError};

/// Response returned by a transport adapter.
///
/// Retry classification derives from `status` alone (2xx / 4xx / other);
/// `data` is an opaque body the dispatcher never inspects.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP-shaped status code
    pub status: u16,
    /// Opaque response body, if any
    pub data: Option<serde_json::Value>,
}

impl TransportResponse {
    /// Response with a bare status and no body.
    pub fn new(status: u16) -> Self {
        Self { status, data: None }
    }
}

/// Batch delivery trait
///
/// All transport implementations must implement this trait. Adapters own
/// serialization and timeouts; the dispatcher owns retry classification.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Deliver a batch to the collector endpoint.
    ///
    /// # Errors
    /// Returns an error only for transport-level failures (connect refused,
    /// timeout). A server-side rejection is a returned status, not an error.
    async fn send(
        &self,
        batch: &[Event],
        endpoint: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TelemetryError>;
}
