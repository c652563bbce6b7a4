//! vigil - dual-process mutual-watchdog keep-alive
//!
//! Keeps a host application alive under a scheduler that aggressively
//! reclaims background processes. Two peer service processes hold bindings
//! to each other; each one treats the loss of its binding as proof the
//! other died and relaunches it, while the local peer maintains a
//! persistent foreground presentation to lower its own kill probability.
//!
//! The host configures and starts the pair through the [`Vigil`] builder:
//!
//! ```no_run
//! use vigil::Vigil;
//!
//! Vigil::new()
//!     .title("Syncing")
//!     .content("Keeping your data fresh")
//!     .music_interval_ms(30_000)
//!     .register()?;
//! # Ok::<(), vigil::VigilError>(())
//! ```
//!
//! Either peer dying is recoverable by the other. Only both dying in the
//! same instant defeats the pair, at which point an external relaunch of
//! the host restarts the cycle.

pub mod binding;
pub mod callbacks;
pub mod config;
pub mod core;
pub mod peer;
pub mod presenter;

mod vigil;

// Re-export commonly used items
pub use crate::callbacks::KeepAliveCallback;
pub use crate::config::{BehaviorSpec, KeepAliveConfig, NotificationSpec, OnePixelMode};
pub use crate::core::error::{Result, VigilError};
pub use crate::core::paths::RuntimePaths;
pub use crate::vigil::{is_running, unregister, Vigil};
