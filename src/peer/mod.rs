//! Peer Process Module
//!
//! The symmetric halves of the watchdog pair: role identity, the
//! counterpart launcher seam, and the controller state machine that reacts
//! to binding gain/loss and keeps the configuration converged.

pub mod controller;
pub mod launcher;
pub mod state;

#[cfg(test)]
mod tests;

pub use controller::{Command, PeerController};
pub use launcher::{CounterpartLauncher, LaunchError, ProcessLauncher};
pub use state::{BindingState, PeerRole};
