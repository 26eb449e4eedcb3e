//! Service states and the lifecycle transition table.
//!
//! The table is the single source of truth for how a service moves between
//! states. Any (state, event) pair it does not list is a no-op.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::service::ServiceKind;

/// Observable state of one supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ServiceState {
    /// No process is running (or it was stopped on request).
    Stopped = 0,
    /// A process was launched and is being polled for readiness.
    Starting = 1,
    /// The Gateway's listener answers the liveness probe.
    Ready = 2,
    /// The Node is paired with the Gateway (or the Gateway has a paired Node).
    Connected = 3,
    /// Startup timed out or the process exited before becoming ready.
    Failed = 4,
}

impl ServiceState {
    /// Every state, in discriminant order.
    pub const ALL: [Self; 5] = [
        Self::Stopped,
        Self::Starting,
        Self::Ready,
        Self::Connected,
        Self::Failed,
    ];

    /// Whether the service is up (Ready or Connected).
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Ready | Self::Connected)
    }

    /// Whether a start request is accepted from this state.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    pub(crate) const fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Ready,
            3 => Self::Connected,
            4 => Self::Failed,
            _ => Self::Stopped,
        }
    }

    /// Apply the transition table.
    ///
    /// Returns the target state, or `None` when `event` has no outgoing edge
    /// from `self`. `StopRequested` from `Stopped` yields `Some(Stopped)`, which
    /// callers see as "no change".
    #[must_use]
    pub const fn next(self, kind: ServiceKind, event: Lifecycle) -> Option<Self> {
        use Lifecycle as E;
        use ServiceState as S;

        match (self, event) {
            (_, E::StopRequested) => Some(S::Stopped),
            (S::Stopped | S::Failed, E::StartRequested) => Some(S::Starting),
            (S::Starting, E::ProbeSucceeded) => Some(match kind {
                ServiceKind::Gateway => S::Ready,
                ServiceKind::Node => S::Connected,
            }),
            (S::Starting, E::AttemptsExhausted | E::ExitedEarly) => Some(S::Failed),
            (S::Ready, E::DependentConnected) => Some(S::Connected),
            (S::Ready | S::Connected, E::ObservedDead) => Some(S::Stopped),
            _ => None,
        }
    }

    /// Lowercase label used in logs and JSON.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle events fed into a service's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// A start was requested (or a running service is being adopted).
    StartRequested,
    /// The readiness probe for this service succeeded.
    ProbeSucceeded,
    /// The startup attempt budget ran out.
    AttemptsExhausted,
    /// The process exited, or could not be launched, before it became ready.
    ExitedEarly,
    /// The dependent service reported a connection.
    DependentConnected,
    /// A running service's process was observed dead.
    ObservedDead,
    /// A stop was requested.
    StopRequested,
}

impl Lifecycle {
    /// Every event.
    pub const ALL: [Self; 7] = [
        Self::StartRequested,
        Self::ProbeSucceeded,
        Self::AttemptsExhausted,
        Self::ExitedEarly,
        Self::DependentConnected,
        Self::ObservedDead,
        Self::StopRequested,
    ];
}

/// Result of applying a [`Lifecycle`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ServiceState,
    pub to: ServiceState,
    /// True only when the state actually changed.
    pub changed: bool,
}

impl Transition {
    pub(crate) const fn unchanged(state: ServiceState) -> Self {
        Self {
            from: state,
            to: state,
            changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTED: &[(ServiceState, Lifecycle)] = &[
        (ServiceState::Stopped, Lifecycle::StartRequested),
        (ServiceState::Failed, Lifecycle::StartRequested),
        (ServiceState::Starting, Lifecycle::ProbeSucceeded),
        (ServiceState::Starting, Lifecycle::AttemptsExhausted),
        (ServiceState::Starting, Lifecycle::ExitedEarly),
        (ServiceState::Ready, Lifecycle::DependentConnected),
        (ServiceState::Ready, Lifecycle::ObservedDead),
        (ServiceState::Connected, Lifecycle::ObservedDead),
    ];

    #[test]
    fn probe_success_depends_on_kind() {
        let gateway = ServiceState::Starting.next(ServiceKind::Gateway, Lifecycle::ProbeSucceeded);
        let node = ServiceState::Starting.next(ServiceKind::Node, Lifecycle::ProbeSucceeded);
        assert_eq!(gateway, Some(ServiceState::Ready));
        assert_eq!(node, Some(ServiceState::Connected));
    }

    #[test]
    fn stop_is_accepted_from_every_state() {
        for kind in ServiceKind::ALL {
            for state in ServiceState::ALL {
                assert_eq!(
                    state.next(kind, Lifecycle::StopRequested),
                    Some(ServiceState::Stopped)
                );
            }
        }
    }

    #[test]
    fn unlisted_pairs_have_no_edge() {
        for kind in ServiceKind::ALL {
            for state in ServiceState::ALL {
                for event in Lifecycle::ALL {
                    if event == Lifecycle::StopRequested || LISTED.contains(&(state, event)) {
                        continue;
                    }
                    assert_eq!(
                        state.next(kind, event),
                        None,
                        "{kind} {state} + {event:?} should be a no-op"
                    );
                }
            }
        }
    }

    #[test]
    fn failures_only_leave_starting() {
        assert_eq!(
            ServiceState::Starting.next(ServiceKind::Gateway, Lifecycle::AttemptsExhausted),
            Some(ServiceState::Failed)
        );
        assert_eq!(
            ServiceState::Ready.next(ServiceKind::Gateway, Lifecycle::AttemptsExhausted),
            None
        );
    }

    #[test]
    fn u8_roundtrip_covers_all_states() {
        for state in ServiceState::ALL {
            assert_eq!(ServiceState::from_u8(state.to_u8()), state);
        }
    }
}
