//! Configuration snapshot persistence
//!
//! The latest adopted record is mirrored to a JSON file so a peer restarted
//! with no payload (and no surviving counterpart to push one) can recover
//! the last known configuration instead of presenting defaults. Writes are
//! atomic: temp file in the same directory, then rename.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::RuntimePaths;

use super::KeepAliveConfig;

/// Configuration persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration persistence
pub type ConfigResult<T> = Result<T, ConfigError>;

/// On-disk envelope around the persisted record.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSnapshot {
    /// When this snapshot was written (informational only)
    #[serde(default)]
    saved_at: String,

    /// The record itself
    config: KeepAliveConfig,
}

/// Reads and writes the persisted configuration snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store at the runtime directory's snapshot location.
    pub fn new(paths: &RuntimePaths) -> Self {
        Self {
            path: paths.snapshot(),
        }
    }

    /// Store at an explicit file path (start payloads).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path of this store.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Persist `config` atomically.
    pub fn save(&self, config: &KeepAliveConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = PersistedSnapshot {
            saved_at: Utc::now().to_rfc3339(),
            config: config.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Persisted configuration snapshot");
        Ok(())
    }

    /// Load the persisted record, if one exists.
    pub fn load(&self) -> ConfigResult<Option<KeepAliveConfig>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: PersistedSnapshot = serde_json::from_str(&json)?;
        Ok(Some(snapshot.config))
    }

    /// Load the persisted record, falling back to defaults on absence or
    /// corruption. A broken snapshot must not keep a peer from starting.
    pub fn load_or_default(&self) -> KeepAliveConfig {
        match self.load() {
            Ok(Some(config)) => config,
            Ok(None) => KeepAliveConfig::default(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable configuration snapshot"
                );
                KeepAliveConfig::default()
            }
        }
    }
}
