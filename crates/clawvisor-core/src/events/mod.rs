//! Events delivered from background work to the single consumer.
//!
//! Everything the supervisor wants a front end to know crosses the boundary
//! as a [`SupervisorEvent`]. The consumer treats the stream as the sole source
//! of truth for service state and log output.

mod log;

pub use log::{LogEvent, Severity};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ServiceKind, ServiceState, Transition};

/// A service moved from one state to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub service: ServiceKind,
    pub from: ServiceState,
    pub to: ServiceState,
    pub timestamp: DateTime<Utc>,
}

impl StateChange {
    /// Build a change record from an applied transition.
    ///
    /// Returns `None` when the transition did not change anything.
    pub fn from_transition(service: ServiceKind, transition: Transition) -> Option<Self> {
        transition.changed.then(|| Self {
            service,
            from: transition.from,
            to: transition.to,
            timestamp: Utc::now(),
        })
    }
}

/// Payload carried by the event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SupervisorEvent {
    Log(LogEvent),
    State(StateChange),
}

impl SupervisorEvent {
    /// The log payload, if this is a log event.
    #[must_use]
    pub const fn as_log(&self) -> Option<&LogEvent> {
        match self {
            Self::Log(log) => Some(log),
            Self::State(_) => None,
        }
    }

    /// The state payload, if this is a state change.
    #[must_use]
    pub const fn as_state(&self) -> Option<&StateChange> {
        match self {
            Self::State(change) => Some(change),
            Self::Log(_) => None,
        }
    }
}

impl From<LogEvent> for SupervisorEvent {
    fn from(event: LogEvent) -> Self {
        Self::Log(event)
    }
}

impl From<StateChange> for SupervisorEvent {
    fn from(change: StateChange) -> Self {
        Self::State(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lifecycle, ServiceStateMachine};

    #[test]
    fn unchanged_transition_yields_no_record() {
        let machine = ServiceStateMachine::new(ServiceKind::Node);
        let t = machine.apply(Lifecycle::ProbeSucceeded);
        assert!(StateChange::from_transition(ServiceKind::Node, t).is_none());
    }

    #[test]
    fn state_event_serialization() {
        let machine = ServiceStateMachine::new(ServiceKind::Gateway);
        let t = machine.apply(Lifecycle::StartRequested);
        let change = StateChange::from_transition(ServiceKind::Gateway, t).unwrap();

        let json = serde_json::to_string(&SupervisorEvent::from(change)).unwrap();
        assert!(json.contains("\"type\":\"state\""));
        assert!(json.contains("\"service\":\"gateway\""));
        assert!(json.contains("\"from\":\"stopped\""));
        assert!(json.contains("\"to\":\"starting\""));
    }

    #[test]
    fn log_event_serialization_skips_missing_service() {
        let event = SupervisorEvent::from(LogEvent::new(Severity::Success, "ready"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"log\""));
        assert!(json.contains("\"severity\":\"success\""));
        assert!(!json.contains("\"service\""));
    }
}
