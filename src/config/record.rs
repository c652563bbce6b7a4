//! Keep-alive configuration record
//!
//! The single unit of state the two peers exchange. A record is immutable
//! once constructed; configuration changes happen by building a new record
//! and propagating it, never by mutating a shared one. The record must
//! survive a trip across the process boundary, so every field serializes
//! without loss.

use serde::{Deserialize, Serialize};

/// Snapshot of presentation and behavioral settings for the watchdog pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    /// Foreground presentation fields
    #[serde(default)]
    pub notification: NotificationSpec,

    /// Behavioral flags
    #[serde(default)]
    pub behavior: BehaviorSpec,
}

/// Presentation fields backing the persistent notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSpec {
    /// Notification title
    #[serde(default = "default_title")]
    pub title: String,

    /// Notification body text
    #[serde(default = "default_content")]
    pub content: String,

    /// Small icon identifier
    #[serde(default = "default_small_icon")]
    pub small_icon: String,

    /// Large icon identifier, if any
    #[serde(default)]
    pub large_icon: Option<String>,

    /// Notification channel id
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Notification channel display name
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Foreground service identifier
    #[serde(default = "default_service_id")]
    pub service_id: u32,

    /// Handle invoked when the notification is clicked
    #[serde(default)]
    pub click_action: Option<String>,

    /// Hide the notification where the platform still allows it
    #[serde(default)]
    pub hide_notification: bool,
}

impl NotificationSpec {
    /// Platform version from which hiding the foreground notification is no
    /// longer permitted. `hide_notification` has no effect at or above it.
    pub const HIDE_SUPPORTED_BELOW: u32 = 24;

    /// Whether the notification is actually hidden on the given platform
    /// version.
    pub fn effective_hidden(&self, platform_version: u32) -> bool {
        self.hide_notification && platform_version < Self::HIDE_SUPPORTED_BELOW
    }
}

impl Default for NotificationSpec {
    fn default() -> Self {
        Self {
            title: default_title(),
            content: default_content(),
            small_icon: default_small_icon(),
            large_icon: None,
            channel_id: default_channel_id(),
            channel_name: default_channel_name(),
            service_id: default_service_id(),
            click_action: None,
            hide_notification: false,
        }
    }
}

fn default_title() -> String {
    "Vigil".to_string()
}

fn default_content() -> String {
    "Service is running".to_string()
}

fn default_small_icon() -> String {
    "ic_vigil_small".to_string()
}

fn default_channel_id() -> String {
    "vigil".to_string()
}

fn default_channel_name() -> String {
    "Vigil".to_string()
}

fn default_service_id() -> u32 {
    1001
}

/// Behavioral flags carried alongside the presentation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSpec {
    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Music-based keep-alive trigger enabled
    #[serde(default)]
    pub music_enabled: bool,

    /// Interval between music keep-alive ticks, in milliseconds
    #[serde(default = "default_music_interval")]
    pub music_interval_ms: u64,

    /// Single-pixel-overlay keep-alive trigger enabled
    #[serde(default)]
    pub one_pixel_enabled: bool,

    /// Overlay variant used when the single-pixel trigger is enabled
    #[serde(default)]
    pub one_pixel_mode: OnePixelMode,
}

impl Default for BehaviorSpec {
    fn default() -> Self {
        Self {
            debug: false,
            music_enabled: false,
            music_interval_ms: default_music_interval(),
            one_pixel_enabled: false,
            one_pixel_mode: OnePixelMode::default(),
        }
    }
}

fn default_music_interval() -> u64 {
    5_000
}

/// Variant of the single-pixel overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnePixelMode {
    /// Opaque one-pixel window
    #[default]
    Standard,
    /// Fully translucent one-pixel window
    Translucent,
}
