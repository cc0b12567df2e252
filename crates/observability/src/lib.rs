//! # Observability
//!
//! Host-facing wiring for the SDK's telemetry-about-telemetry.
//!
//! The pipeline crates log through `tracing` and publish their counters
//! through the `metrics` facade at the dispatcher's decision points (see
//! `dispatcher::DispatchMetrics`); both stay inert until the host installs
//! a subscriber and a recorder. Hosts with their own observability stack
//! need nothing from this crate. For everyone else:
//!
//! ```ignore
//! observability::init()?;                    // warn-level console logging
//! observability::install_prometheus(9100)?;  // opt-in local /metrics
//! ```

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

/// Default posture inside a host app: surface SDK warnings (evictions,
/// quota hits, rejected batches), keep per-event delivery noise out of the
/// host's logs. `RUST_LOG` overrides.
const DEFAULT_DIRECTIVES: &str = "warn";

/// Console logging at the SDK's default warn level.
pub fn init() -> Result<()> {
    init_with_directives(DEFAULT_DIRECTIVES)
}

/// Console logging with explicit filter directives, e.g.
/// `"warn,dispatcher=debug"` to watch flush cycles without opening the
/// host's own crates up.
pub fn init_with_directives(directives: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

/// Structured JSON logging for hosts shipping logs to an aggregator.
pub fn init_json() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

/// Expose the SDK's `telemetry_sdk_*` counters on a loopback Prometheus
/// endpoint.
///
/// An embedded SDK must not open ports on its own, so this is opt-in and
/// binds 127.0.0.1 only; hosts that want the metrics scraped remotely
/// install their own recorder instead.
pub fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([127, 0, 0, 1], port))
        .install()
        .context("failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}
