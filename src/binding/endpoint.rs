//! Socket endpoints
//!
//! Each role owns one listener socket in the runtime directory. A stale
//! socket file from a killed process would block rebinding, so it is removed
//! before bind. Permissions are restricted to the owner.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tokio::net::{UnixListener, UnixStream};

use crate::core::paths::RuntimePaths;
use crate::peer::PeerRole;

use super::BindingError;

/// Listener socket path for `role`.
pub fn socket_path(paths: &RuntimePaths, role: PeerRole) -> PathBuf {
    paths.socket(role.socket_file())
}

/// Bind this role's listener, replacing any stale socket file.
pub fn bind_listener(paths: &RuntimePaths, role: PeerRole) -> Result<UnixListener, BindingError> {
    paths.ensure()?;
    let path = socket_path(paths, role);

    // Ignore NotFound to avoid a remove/bind race on the stale file
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Err(e.into());
        }
    }

    let listener = UnixListener::bind(&path).map_err(|source| BindingError::Bind {
        path: path.clone(),
        source,
    })?;

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;

    tracing::debug!(path = %path.display(), %role, "Listener bound");
    Ok(listener)
}

/// Open a binding to `role`'s listener. Failure means the counterpart is
/// absent or not yet listening.
pub async fn connect_counterpart(
    paths: &RuntimePaths,
    role: PeerRole,
) -> Result<UnixStream, BindingError> {
    let path = socket_path(paths, role);
    UnixStream::connect(&path)
        .await
        .map_err(|source| BindingError::Connect { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_then_connect_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(dir.path());

        let _listener = bind_listener(&paths, PeerRole::Local).unwrap();
        connect_counterpart(&paths, PeerRole::Local).await.unwrap();
    }

    #[tokio::test]
    async fn stale_socket_file_does_not_block_rebind() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(dir.path());
        paths.ensure().unwrap();

        // Simulate a crashed peer's leftover socket file
        std::fs::write(socket_path(&paths, PeerRole::Remote), b"").unwrap();

        let _listener = bind_listener(&paths, PeerRole::Remote).unwrap();
        connect_counterpart(&paths, PeerRole::Remote).await.unwrap();
    }

    #[tokio::test]
    async fn connect_to_absent_peer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(dir.path());

        let result = connect_counterpart(&paths, PeerRole::Remote).await;
        assert!(matches!(result, Err(BindingError::Connect { .. })));
    }

    #[tokio::test]
    async fn socket_permissions_are_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(dir.path());

        let _listener = bind_listener(&paths, PeerRole::Local).unwrap();

        let mode = std::fs::metadata(socket_path(&paths, PeerRole::Local))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
