//! Runtime directory layout
//!
//! Both peers and the orchestrator rendezvous through a single runtime
//! directory holding the per-role sockets, the persisted configuration
//! snapshot, and the presentation surface file. The base directory is
//! overridable so tests and multi-instance hosts can isolate themselves.

use std::path::{Path, PathBuf};

/// Resolved locations of the files the watchdog pair shares on disk.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    base: PathBuf,
}

impl RuntimePaths {
    /// Use an explicit base directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory for sockets and state files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create the base directory if it does not exist yet.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)
    }

    /// Path of a role's listener socket.
    pub fn socket(&self, file_name: &str) -> PathBuf {
        self.base.join(file_name)
    }

    /// Path of the persisted configuration snapshot.
    pub fn snapshot(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Path of the rendered foreground-presentation state.
    pub fn presentation(&self) -> PathBuf {
        self.base.join("presentation.json")
    }
}

impl Default for RuntimePaths {
    fn default() -> Self {
        let base = dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("vigil");
        Self { base }
    }
}
