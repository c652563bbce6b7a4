//! Peer roles and binding state
//!
//! The two peers are symmetric; the role only decides which socket a peer
//! listens on and which counterpart it supervises.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which of the two cooperating service processes this peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    Local,
    Remote,
}

impl PeerRole {
    /// The role this peer supervises.
    pub fn counterpart(self) -> Self {
        match self {
            PeerRole::Local => PeerRole::Remote,
            PeerRole::Remote => PeerRole::Local,
        }
    }

    /// File name of this role's listener socket.
    pub fn socket_file(self) -> &'static str {
        match self {
            PeerRole::Local => "vigil-local.sock",
            PeerRole::Remote => "vigil-remote.sock",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeerRole::Local => "local",
            PeerRole::Remote => "remote",
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(PeerRole::Local),
            "remote" => Ok(PeerRole::Remote),
            other => Err(format!("Unknown peer role: {}", other)),
        }
    }
}

/// Binding lifecycle of one peer toward its counterpart.
///
/// `Unbound` exists only transiently: losing the binding immediately
/// schedules a rebind, so a running peer is never left unsupervised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindingState {
    /// No binding and no attempt in flight yet
    #[default]
    Unbound,
    /// Launch/connect attempt in flight or scheduled
    Binding,
    /// Live binding to the counterpart
    Bound,
}
