//! Host callback hooks
//!
//! The host application can register callbacks fired on named lifecycle
//! events: a work tick whenever the local peer starts or adopts a changed
//! record, and a stop notification on teardown. Handlers run synchronously
//! on the controller's event-loop task and must not block significantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

/// Callback surface exposed to the host application.
pub trait KeepAliveCallback: Send + Sync {
    /// Work tick. `times` counts controller starts and changed-record
    /// adoptions in this process, starting at 1.
    fn on_work(&self, times: u64);

    /// The watchdog pair is shutting down.
    fn on_stop(&self) {}
}

lazy_static! {
    static ref CALLBACKS: RwLock<Vec<Arc<dyn KeepAliveCallback>>> = RwLock::new(Vec::new());
}

static WORK_TICKS: AtomicU64 = AtomicU64::new(0);

/// Register a callback for the lifetime of the process.
pub fn register(callback: Arc<dyn KeepAliveCallback>) {
    CALLBACKS.write().push(callback);
}

/// Register a plain closure as a work-tick callback.
pub fn register_fn<F>(f: F)
where
    F: Fn(u64) + Send + Sync + 'static,
{
    struct FnCallback<F>(F);

    impl<F> KeepAliveCallback for FnCallback<F>
    where
        F: Fn(u64) + Send + Sync,
    {
        fn on_work(&self, times: u64) {
            (self.0)(times)
        }
    }

    register(Arc::new(FnCallback(f)));
}

/// Drop all registered callbacks.
pub fn clear() {
    CALLBACKS.write().clear();
}

/// Fire a work tick on every registered callback. Returns the tick count
/// that was delivered.
pub fn notify_work() -> u64 {
    let times = WORK_TICKS.fetch_add(1, Ordering::SeqCst) + 1;
    for callback in CALLBACKS.read().iter() {
        callback.on_work(times);
    }
    times
}

/// Fire the stop notification on every registered callback.
pub fn notify_stop() {
    for callback in CALLBACKS.read().iter() {
        callback.on_stop();
    }
}
