//! SdkConfig - immutable dispatch configuration
//!
//! Defaults are applied at construction / deserialization time; validation
//! lives in the client crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable SDK configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// API key sent with every batch
    pub api_key: String,

    /// Collector endpoint (HTTPS scheme enforced at validation)
    pub endpoint: String,

    /// Header name carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Periodic flush interval in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Events taken from the queue head per transport request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// In-memory buffer cap; `None` = unbounded
    #[serde(default)]
    pub max_buffer_size: Option<usize>,

    /// Retransmissions per event before terminal drop
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_max_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl SdkConfig {
    /// Config with defaults for the given key and endpoint.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_key_header: default_api_key_header(),
            flush_interval_ms: default_flush_interval_ms(),
            max_batch_size: default_max_batch_size(),
            max_buffer_size: None,
            max_retries: default_max_retries(),
        }
    }

    /// Flush interval as a [`Duration`].
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
