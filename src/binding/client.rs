//! One-shot peer client
//!
//! Used by the orchestrator to reach an already-running peer: push an
//! updated record or request teardown. Synchronous on purpose; the public
//! builder API has no async surface.

use std::io::Write;
use std::os::unix::net::UnixStream;

use crate::core::paths::RuntimePaths;
use crate::peer::PeerRole;

use super::wire::{PeerMessage, WAKEUP_TIMEOUT};
use super::{endpoint, BindingError};

/// Deliver a single message to `role`'s listener and disconnect.
pub fn send_to_peer(
    paths: &RuntimePaths,
    role: PeerRole,
    message: &PeerMessage,
) -> Result<(), BindingError> {
    let path = endpoint::socket_path(paths, role);
    let mut stream = UnixStream::connect(&path).map_err(|source| BindingError::Connect {
        path,
        source,
    })?;
    stream.set_write_timeout(Some(WAKEUP_TIMEOUT))?;

    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stream.write_all(line.as_bytes())?;
    stream.flush()?;
    Ok(())
}

/// Whether a peer is accepting bindings on its socket.
pub fn is_peer_running(paths: &RuntimePaths, role: PeerRole) -> bool {
    UnixStream::connect(endpoint::socket_path(paths, role)).is_ok()
}
