//! Config loading and validation
//!
//! Validation rules:
//! - api_key / endpoint non-empty
//! - endpoint uses the https scheme
//! - flush_interval_ms > 0
//! - max_batch_size > 0

use std::path::Path;

use contracts::{SdkConfig, TelemetryError};

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Config loader
///
/// Static methods for loading [`SdkConfig`] from files or strings.
/// Validation runs after parsing.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a file path, detecting the format from the extension
    /// (.toml / .json).
    ///
    /// # Errors
    /// - file read failure
    /// - unsupported format
    /// - parse failure
    /// - validation failure
    pub fn load_from_path(path: &Path) -> Result<SdkConfig, TelemetryError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load from a string in the given format.
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<SdkConfig, TelemetryError> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| TelemetryError::config_parse(format!("TOML parse error: {e}")))?,
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| TelemetryError::config_parse(format!("JSON parse error: {e}")))?,
        };
        validate(&config)?;
        Ok(config)
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, TelemetryError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            TelemetryError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            TelemetryError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

/// Validate an [`SdkConfig`].
///
/// Returns the first error encountered, or `Ok(())`.
pub fn validate(config: &SdkConfig) -> Result<(), TelemetryError> {
    if config.api_key.is_empty() {
        return Err(TelemetryError::config_validation(
            "api_key",
            "must not be empty",
        ));
    }
    if config.endpoint.is_empty() {
        return Err(TelemetryError::config_validation(
            "endpoint",
            "must not be empty",
        ));
    }
    if !config.endpoint.starts_with("https://") {
        return Err(TelemetryError::config_validation(
            "endpoint",
            format!("https scheme required, got '{}'", config.endpoint),
        ));
    }
    if config.api_key_header.is_empty() {
        return Err(TelemetryError::config_validation(
            "api_key_header",
            "must not be empty",
        ));
    }
    if config.flush_interval_ms == 0 {
        return Err(TelemetryError::config_validation(
            "flush_interval_ms",
            "must be > 0",
        ));
    }
    if config.max_batch_size == 0 {
        return Err(TelemetryError::config_validation(
            "max_batch_size",
            "must be > 0",
        ));
    }
    Ok(())
}
