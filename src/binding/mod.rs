//! Cross-Process Binding Module
//!
//! The contract each peer exposes to the other: newline-delimited JSON
//! messages over a per-role Unix domain socket. The persistent connection a
//! peer holds to its counterpart's listener is the binding itself; losing it
//! (EOF or error) is the primary liveness-failure signal, not an error to
//! report upward.

mod client;
mod endpoint;
mod wire;

use std::path::PathBuf;

use thiserror::Error;

pub use client::{is_peer_running, send_to_peer};
pub use endpoint::{bind_listener, connect_counterpart, socket_path};
pub use wire::{read_message, write_message, PeerMessage, WAKEUP_TIMEOUT};

/// Binding-layer errors
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Failed to bind listener socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to peer socket {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Delivery timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
