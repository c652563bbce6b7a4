//! Public keep-alive API
//!
//! `Vigil` is the builder the host application uses to describe the
//! foreground presentation and behavioral flags, then start the watchdog
//! pair. The builder is the only place a record is constructed from loose
//! fields; everything downstream propagates it as an immutable whole.
//!
//! Nothing here escalates watchdog failures back to the host: once
//! registered, the pair is silently self-healing. The only state the host
//! can observe is the callbacks it registered and, with the debug flag, the
//! log stream.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::binding::{self, PeerMessage};
use crate::callbacks::{self, KeepAliveCallback};
use crate::config::{self, BehaviorSpec, KeepAliveConfig, NotificationSpec, OnePixelMode, SnapshotStore};
use crate::core::error::Result;
use crate::core::paths::RuntimePaths;
use crate::peer::{LaunchError, PeerRole};

/// Builder for the watchdog pair.
///
/// If both peers are ever killed in the same instant there is nobody left
/// to resurrect them; recovery then depends on the host being relaunched
/// and calling [`Vigil::register`] again. That is the accepted limit of the
/// scheme, not an error condition.
#[derive(Default)]
pub struct Vigil {
    notification: NotificationSpec,
    behavior: BehaviorSpec,
    peer_executable: Option<PathBuf>,
    runtime_dir: Option<PathBuf>,
}

impl Vigil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notification title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.notification.title = title.into();
        self
    }

    /// Notification body text.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.notification.content = content.into();
        self
    }

    /// Small icon identifier.
    pub fn small_icon(mut self, icon: impl Into<String>) -> Self {
        self.notification.small_icon = icon.into();
        self
    }

    /// Large icon identifier.
    pub fn large_icon(mut self, icon: impl Into<String>) -> Self {
        self.notification.large_icon = Some(icon.into());
        self
    }

    /// Notification channel id.
    pub fn channel_id(mut self, id: impl Into<String>) -> Self {
        self.notification.channel_id = id.into();
        self
    }

    /// Notification channel display name.
    pub fn channel_name(mut self, name: impl Into<String>) -> Self {
        self.notification.channel_name = name.into();
        self
    }

    /// Foreground service identifier.
    pub fn service_id(mut self, id: u32) -> Self {
        self.notification.service_id = id;
        self
    }

    /// Handle invoked when the notification is clicked.
    pub fn click_action(mut self, action: impl Into<String>) -> Self {
        self.notification.click_action = Some(action.into());
        self
    }

    /// Hide the notification on platforms that still allow it.
    pub fn hide_notification(mut self, hide: bool) -> Self {
        self.notification.hide_notification = hide;
        self
    }

    /// Verbose logging in both peers.
    pub fn debug(mut self, debug: bool) -> Self {
        self.behavior.debug = debug;
        self
    }

    /// Enable the music-based keep-alive trigger.
    pub fn music_enabled(mut self, enabled: bool) -> Self {
        self.behavior.music_enabled = enabled;
        self
    }

    /// Interval between music keep-alive ticks. Longer intervals cost less
    /// battery. Negative input is ignored and the previous value retained.
    pub fn music_interval_ms(mut self, interval_ms: i64) -> Self {
        if interval_ms >= 0 {
            self.behavior.music_interval_ms = interval_ms as u64;
        }
        self
    }

    /// Enable the single-pixel-overlay keep-alive trigger.
    pub fn one_pixel_enabled(mut self, enabled: bool) -> Self {
        self.behavior.one_pixel_enabled = enabled;
        self
    }

    /// Overlay variant used by the single-pixel trigger.
    pub fn one_pixel_mode(mut self, mode: OnePixelMode) -> Self {
        self.behavior.one_pixel_mode = mode;
        self
    }

    /// Override the peer service binary. Defaults to `vigil-peer` next to
    /// the current executable.
    pub fn peer_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.peer_executable = Some(path.into());
        self
    }

    /// Override the runtime directory holding sockets and state files.
    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    /// Register a lifecycle callback.
    pub fn add_callback(self, callback: Arc<dyn KeepAliveCallback>) -> Self {
        callbacks::register(callback);
        self
    }

    /// Construct the record this builder describes.
    pub fn build(&self) -> KeepAliveConfig {
        KeepAliveConfig {
            notification: self.notification.clone(),
            behavior: self.behavior.clone(),
        }
    }

    fn paths(&self) -> RuntimePaths {
        self.runtime_dir
            .clone()
            .map(RuntimePaths::new)
            .unwrap_or_default()
    }

    /// Build the record and start the watchdog pair. If a pair is already
    /// serving this runtime directory, the new record is pushed to it
    /// instead; the running peers converge on it like on any other wakeup.
    pub fn register(self) -> Result<()> {
        let paths = self.paths();
        let record = self.build();

        config::replace(record.clone());
        SnapshotStore::new(&paths).save(&record)?;

        if binding::is_peer_running(&paths, PeerRole::Local) {
            push_record(&paths, record)?;
            return Ok(());
        }

        let executable = self
            .peer_executable
            .clone()
            .unwrap_or_else(default_peer_executable);

        let mut command = Command::new(&executable);
        command
            .arg("--role")
            .arg(PeerRole::Local.as_str())
            .arg("--dir")
            .arg(paths.base())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if record.behavior.debug {
            command.arg("--debug");
        }

        let child = command.spawn().map_err(LaunchError::Spawn)?;
        tracing::info!(pid = child.id(), "Started watchdog pair");
        Ok(())
    }

    /// Push this builder's record to an already running pair without
    /// attempting to start one. Fails if no pair is serving the runtime
    /// directory.
    pub fn update(self) -> Result<()> {
        let paths = self.paths();
        let record = self.build();

        config::replace(record.clone());
        SnapshotStore::new(&paths).save(&record)?;
        push_record(&paths, record)
    }
}

fn push_record(paths: &RuntimePaths, record: KeepAliveConfig) -> Result<()> {
    binding::send_to_peer(paths, PeerRole::Local, &PeerMessage::Wakeup { config: record })?;
    tracing::info!("Pushed updated record to the running watchdog pair");
    Ok(())
}

/// Stop a running watchdog pair. The local peer forwards the teardown to
/// its counterpart; neither re-enters recovery.
pub fn unregister(paths: &RuntimePaths) -> Result<()> {
    binding::send_to_peer(paths, PeerRole::Local, &PeerMessage::Shutdown)?;
    callbacks::notify_stop();
    Ok(())
}

/// Whether a watchdog pair is serving the given runtime directory.
pub fn is_running(paths: &RuntimePaths) -> bool {
    binding::is_peer_running(paths, PeerRole::Local)
}

fn default_peer_executable() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("vigil-peer")))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from("vigil-peer"))
}
