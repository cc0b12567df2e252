//! # Client
//!
//! Public SDK facade over the dispatch engine.
//!
//! Responsibilities:
//! - Construct and wire the dispatcher, metadata manager and runtime probes
//! - Buffer pre-init `track` calls and replay them in order
//! - Load and validate configuration

pub mod client;
pub mod config;
pub mod metadata;

pub use client::{ClientBuilder, TelemetryClient};
pub use config::{validate, ConfigFormat, ConfigLoader};
pub use contracts::{FieldMap, Platform, SdkConfig, TelemetryError};
pub use metadata::MetadataManager;
