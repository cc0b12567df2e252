//! FileStore - slot-file persistence with atomic replace

use std::path::PathBuf;

use contracts::{Event, EventStore, TelemetryError};
use tracing::debug;

/// Stores the pending-event slot as a single JSON file.
///
/// `save` writes a sibling temp file and renames it over the slot, so the
/// slot always holds either the previous sequence or the new one, never a
/// partial write. An optional quota bounds the persisted count: when
/// exceeded, the oldest events are shed, the reduced set is saved, and the
/// quota error reports the kept/dropped counts.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    max_events: Option<usize>,
}

impl FileStore {
    /// Unbounded store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_events: None,
        }
    }

    /// Store bounded to `max_events` persisted events.
    pub fn with_quota(path: impl Into<PathBuf>, max_events: usize) -> Self {
        Self {
            path: path.into(),
            max_events: Some(max_events),
        }
    }

    /// Slot file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn write_atomic(&self, events: &[Event]) -> Result<(), TelemetryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec(events)
            .map_err(|e| TelemetryError::storage(format!("slot encode error: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(events = events.len(), path = %self.path.display(), "slot saved");
        Ok(())
    }
}

impl EventStore for FileStore {
    async fn save(&self, events: &[Event]) -> Result<(), TelemetryError> {
        match self.max_events {
            Some(max) if events.len() > max => {
                let dropped = events.len() - max;
                let reduced = &events[dropped..];
                self.write_atomic(reduced)?;
                Err(TelemetryError::StorageQuota {
                    saved: reduced.len(),
                    dropped,
                })
            }
            _ => self.write_atomic(events),
        }
    }

    async fn load(&self) -> Result<Vec<Event>, TelemetryError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| TelemetryError::storage(format!("corrupt slot file: {e}")))
    }

    async fn clear(&self) -> Result<(), TelemetryError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
