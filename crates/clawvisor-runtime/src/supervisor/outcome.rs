//! Result values returned by supervisor operations.

use std::fmt;

use clawvisor_core::{ServiceKind, ServiceState};
use serde::Serialize;

/// How a start request ended.
///
/// Starting never fails with an error: every problem is already reported on
/// the event sink, and the outcome only tells the caller where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// The Node is connected (and therefore the Gateway is up).
    Started,
    /// Nothing to do: the requested service is already running.
    AlreadyRunning,
    /// Another start of the same service is in flight.
    InProgress,
    /// The Node was not started because the Gateway is not up.
    GatewayNotReady,
    /// The Gateway failed to spawn, exited, or never became ready.
    GatewayFailed,
    /// The Node failed to spawn, exited, or never connected.
    NodeFailed,
    /// A stop arrived while the start was waiting.
    Cancelled,
}

impl StartOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Started | Self::AlreadyRunning)
    }
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Started => "services started",
            Self::AlreadyRunning => "already running",
            Self::InProgress => "start already in progress",
            Self::GatewayNotReady => "gateway is not ready",
            Self::GatewayFailed => "gateway failed to start",
            Self::NodeFailed => "node failed to connect",
            Self::Cancelled => "start cancelled by stop",
        };
        f.write_str(text)
    }
}

/// What a stop actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StopSummary {
    /// Handles this call terminated.
    pub terminated: usize,
    /// Kill requests issued by the name sweep.
    pub swept: usize,
}

/// Point-in-time view of both services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub gateway: ServiceState,
    pub node: ServiceState,
}

impl StatusSnapshot {
    #[must_use]
    pub const fn get(&self, kind: ServiceKind) -> ServiceState {
        match kind {
            ServiceKind::Gateway => self.gateway,
            ServiceKind::Node => self.node,
        }
    }
}
