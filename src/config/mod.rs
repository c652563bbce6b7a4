//! Configuration Module
//!
//! The keep-alive configuration record, the process-wide authoritative
//! snapshot of it, and its persisted mirror on disk.

mod current;
mod record;
mod storage;


pub use current::{current, replace};
pub use record::{BehaviorSpec, KeepAliveConfig, NotificationSpec, OnePixelMode};
pub use storage::{ConfigError, ConfigResult, SnapshotStore};
