//! Counterpart launcher
//!
//! When a peer's binding drops and the counterpart's socket is unreachable,
//! the counterpart process must be relaunched. The launcher is a trait seam
//! so tests can supervise in-process peers instead of spawning binaries.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::core::paths::RuntimePaths;

use super::PeerRole;

/// Launcher errors
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to resolve peer executable: {0}")]
    Executable(#[source] std::io::Error),

    #[error("Failed to spawn peer process: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Launches the counterpart peer process.
pub trait CounterpartLauncher: Send {
    /// Start a process serving `role` against the given runtime directory.
    /// Called only while the counterpart's socket is unreachable; the caller
    /// bounds the call rate with its rebind backoff.
    fn launch(&mut self, role: PeerRole, paths: &RuntimePaths) -> Result<(), LaunchError>;
}

/// Spawns the peer service binary with the counterpart role.
pub struct ProcessLauncher {
    executable: PathBuf,
    debug: bool,
    children: Vec<Child>,
}

impl ProcessLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            debug: false,
            children: Vec::new(),
        }
    }

    /// Relaunch through the binary this process was started from. The two
    /// roles share one executable.
    pub fn from_current_exe() -> Result<Self, LaunchError> {
        let executable = std::env::current_exe().map_err(LaunchError::Executable)?;
        Ok(Self::new(executable))
    }

    /// Pass `--debug` to launched peers.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Reap exited children so repeated relaunches do not accumulate
    /// zombie processes.
    fn reap(&mut self) {
        self.children
            .retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
    }
}

impl CounterpartLauncher for ProcessLauncher {
    fn launch(&mut self, role: PeerRole, paths: &RuntimePaths) -> Result<(), LaunchError> {
        self.reap();

        let mut command = Command::new(&self.executable);
        command
            .arg("--role")
            .arg(role.as_str())
            .arg("--dir")
            .arg(paths.base())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if self.debug {
            command.arg("--debug");
        }

        let child = command.spawn().map_err(LaunchError::Spawn)?;
        tracing::info!(pid = child.id(), %role, "Launched counterpart peer");
        self.children.push(child);
        Ok(())
    }
}
