//! Process-wide authoritative record
//!
//! Each peer process holds exactly one authoritative `KeepAliveConfig` at a
//! time, modeled as an atomically swapped immutable snapshot. Adoption is
//! wholesale replacement; there is no merging and no in-place mutation.

use std::sync::Arc;

use arc_swap::ArcSwap;
use lazy_static::lazy_static;

use super::KeepAliveConfig;

lazy_static! {
    static ref CURRENT: ArcSwap<KeepAliveConfig> =
        ArcSwap::from_pointee(KeepAliveConfig::default());
}

/// The record this process currently considers authoritative.
pub fn current() -> Arc<KeepAliveConfig> {
    CURRENT.load_full()
}

/// Replace the authoritative record. Returns whether the new record differs
/// from the one it superseded.
pub fn replace(config: KeepAliveConfig) -> bool {
    let next = Arc::new(config);
    let previous = CURRENT.swap(Arc::clone(&next));
    *previous != *next
}
