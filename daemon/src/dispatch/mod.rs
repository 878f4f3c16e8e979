//! Outbound side of the pipeline: the HTTP client that talks to the
//! OpenShock API and the gate that clamps intensity and enforces cooldown.

pub mod gate;
pub mod openshock;

use async_trait::async_trait;

use crate::errors::DispatchError;

pub use gate::DispatchGate;
pub use openshock::OpenShockClient;

/// A fully resolved command ready to go over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShockCommand {
    pub intensity: u32,
    pub duration_ms: u32,
    pub control_id: String,
}

/// Acknowledgement from the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchAck {
    pub status: u16,
}

/// Transport for resolved commands. The gate owns one of these; tests
/// substitute a recording mock.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, command: &ShockCommand) -> Result<DispatchAck, DispatchError>;
}
