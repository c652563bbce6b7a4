//! Core Module
//!
//! Crate-level error types and the shared runtime directory layout.

pub mod error;
pub mod paths;

pub use error::{Result, VigilError};
pub use paths::RuntimePaths;
