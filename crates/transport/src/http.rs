//! HttpTransport - JSON batch delivery to the collector

use std::collections::HashMap;

use contracts::{Event, TelemetryError, Transport, TransportResponse};
use tracing::{debug, instrument};

/// Transport that POSTs JSON-serialized batches.
///
/// Owns serialization and (via the underlying client) timeouts. Owns no
/// retry logic: server rejections come back as statuses and only
/// connection-level failures are errors; the dispatcher classifies both.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Transport over a preconfigured client (timeouts, proxy, TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    #[instrument(
        name = "http_transport_send",
        skip(self, batch, headers),
        fields(batch_len = batch.len())
    )]
    async fn send(
        &self,
        batch: &[Event],
        endpoint: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TelemetryError> {
        let mut request = self.client.post(endpoint).json(batch);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TelemetryError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let data = response.json::<serde_json::Value>().await.ok();
        debug!(status, "collector responded");

        Ok(TransportResponse { status, data })
    }
}
