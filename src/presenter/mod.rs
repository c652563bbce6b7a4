//! Foreground Presenter Module
//!
//! Maintains the externally visible state that keeps one peer classified as
//! foreground by the scheduler. The controller treats presentation as
//! fire-and-forget: `present` is called on every peer start and every
//! wakeup, must be idempotent, and must not block the event loop.
//!
//! Platform notification surfaces live behind the `Presenter` trait; the
//! shipped implementations are a structured-log surface and a file-backed
//! stand-in that makes the rendered state observable in development and
//! tests.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::NotificationSpec;
use crate::core::paths::RuntimePaths;

/// Platform version assumed when none is supplied. At or above the hide
/// threshold, so notifications default to visible.
pub const DEFAULT_PLATFORM_VERSION: u32 = NotificationSpec::HIDE_SUPPORTED_BELOW;

/// Foreground presentation surface.
pub trait Presenter: Send {
    /// Refresh the presentation to match `spec`. Idempotent; safe to call
    /// on every wakeup and every peer start.
    fn present(&mut self, spec: &NotificationSpec);
}

/// Presentation surface that renders to the structured log.
pub struct LogPresenter {
    platform_version: u32,
}

impl LogPresenter {
    pub fn new(platform_version: u32) -> Self {
        Self { platform_version }
    }
}

impl Default for LogPresenter {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_VERSION)
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, spec: &NotificationSpec) {
        if spec.effective_hidden(self.platform_version) {
            tracing::debug!(service_id = spec.service_id, "Foreground presentation hidden");
            return;
        }

        tracing::info!(
            title = %spec.title,
            content = %spec.content,
            channel = %spec.channel_id,
            service_id = spec.service_id,
            "Foreground presentation refreshed"
        );
    }
}

/// Rendered state the file-backed presenter writes.
#[derive(Debug, Serialize)]
struct RenderedPresentation<'a> {
    visible: bool,
    title: &'a str,
    content: &'a str,
    small_icon: &'a str,
    large_icon: Option<&'a str>,
    channel_id: &'a str,
    channel_name: &'a str,
    service_id: u32,
    click_action: Option<&'a str>,
}

/// Presentation surface that mirrors the rendered state to a file.
pub struct FilePresenter {
    path: PathBuf,
    platform_version: u32,
    last_rendered: Option<String>,
}

impl FilePresenter {
    pub fn new(path: impl Into<PathBuf>, platform_version: u32) -> Self {
        Self {
            path: path.into(),
            platform_version,
            last_rendered: None,
        }
    }

    /// Where the rendered state is written.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn render(&self, spec: &NotificationSpec) -> String {
        let rendered = RenderedPresentation {
            visible: !spec.effective_hidden(self.platform_version),
            title: &spec.title,
            content: &spec.content,
            small_icon: &spec.small_icon,
            large_icon: spec.large_icon.as_deref(),
            channel_id: &spec.channel_id,
            channel_name: &spec.channel_name,
            service_id: spec.service_id,
            click_action: spec.click_action.as_deref(),
        };
        // The spec is plain data; serialization cannot fail
        serde_json::to_string_pretty(&rendered).unwrap_or_default()
    }
}

impl Presenter for FilePresenter {
    fn present(&mut self, spec: &NotificationSpec) {
        let rendered = self.render(spec);

        // Repeat presentations of the same record are no-ops
        if self.last_rendered.as_deref() == Some(rendered.as_str()) {
            return;
        }

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, &rendered) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to refresh presentation");
            return;
        }

        self.last_rendered = Some(rendered);
        tracing::debug!(title = %spec.title, "Foreground presentation refreshed");
    }
}

/// Default presentation surface for a peer process.
pub fn create_presenter(paths: &RuntimePaths) -> Box<dyn Presenter> {
    Box::new(FilePresenter::new(
        paths.presentation(),
        DEFAULT_PLATFORM_VERSION,
    ))
}
