use crate::lifecycle::Command;
use crate::snapshot::{ClusterSnapshot, SnapshotError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Controller path that answers both refreshes and commands with a snapshot.
pub const CONSOLE_UPDATE_PATH: &str = "/console_update";

/// Body posted to [`CONSOLE_UPDATE_PATH`]. An empty body is a plain refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
}

impl ConsoleRequest {
    pub fn refresh() -> Self {
        Self::default()
    }

    /// Builds the request for `command`, attaching `staged_solver` untouched
    /// when the command carries solver text.
    pub fn command(command: Command, staged_solver: &str) -> Self {
        Self {
            command: Some(command),
            solver: command
                .carries_solver()
                .then(|| staged_solver.to_string()),
        }
    }

    pub fn is_refresh(&self) -> bool {
        self.command.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("controller answered HTTP {status}")]
    Status { status: u16 },
    #[error("snapshot decode failed: {0}")]
    Decode(String),
    #[error("snapshot rejected: {0}")]
    Invalid(#[from] SnapshotError),
}

/// Parses and validates a controller response body.
pub fn decode_snapshot(bytes: &[u8]) -> Result<ClusterSnapshot, ProtocolError> {
    let snapshot: ClusterSnapshot =
        serde_json::from_slice(bytes).map_err(|err| ProtocolError::Decode(err.to_string()))?;
    snapshot.validate()?;
    Ok(snapshot)
}
