//! Layered error definitions
//!
//! Layered by source: config / lifecycle / transport / storage.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum TelemetryError {
    // ===== Config errors =====
    /// Config parse error
    #[error("config parse error: {message}")]
    ConfigParse { message: String },

    /// Config validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Lifecycle errors =====
    /// Illegal state transition
    #[error("lifecycle error: {message}")]
    Lifecycle { message: String },

    /// Malformed track call
    #[error("invalid event: {message}")]
    InvalidEvent { message: String },

    // ===== Transport errors =====
    /// Transport-layer failure (connect, timeout, serialization)
    #[error("transport error: {message}")]
    Transport { message: String },

    // ===== Storage errors =====
    /// Persistence failure; the in-memory queue stays authoritative
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Quota-bounded save: the adapter shed oldest events and saved the rest
    #[error("storage quota exceeded: kept {saved}, dropped {dropped}")]
    StorageQuota { saved: usize, dropped: usize },

    // ===== Generic =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a lifecycle error
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Create an invalid-event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
