//! Error types for vigil
//!
//! Per-module error enums aggregated into a single crate-level error.
//! Nothing in the watchdog core escalates to the host application as a hard
//! failure; these types surface only at the public API and binary edges.

use thiserror::Error;

/// Result type alias for vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Main error type for vigil
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Binding error: {0}")]
    Binding(#[from] crate::binding::BindingError),

    #[error("Launch error: {0}")]
    Launch(#[from] crate::peer::LaunchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
