//! Readiness probe port.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Node connection status as reported by the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Side-effect-free checks for both services.
///
/// Probes never fail: any error is folded into a negative answer.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Whether the Gateway's listener answers at all.
    async fn gateway_alive(&self) -> bool;

    /// Whether a Node is paired with the Gateway.
    async fn node_connection(&self) -> ConnectionState;
}
