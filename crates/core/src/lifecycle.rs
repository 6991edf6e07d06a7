//! Worker lifecycle states and outcomes shared by the controller and host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, install not yet started.
    Parsed,
    Installing,
    /// Precached and waiting for the host to allow activation.
    Installed,
    Activating,
    /// Serving fetches.
    Activated,
    /// Failed or superseded; never serves again.
    Redundant,
}

impl WorkerState {
    pub fn can_handle_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// What a completed install asks of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// Fast activation ran during install; the host should hand control to
    /// this generation immediately.
    Activated,
    /// Major version changed; activation waits until the host decides it is safe.
    Waiting,
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}
