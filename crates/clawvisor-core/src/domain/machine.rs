//! Lock-free per-service state machine.

use std::sync::atomic::{AtomicU8, Ordering};

use super::service::ServiceKind;
use super::state::{Lifecycle, ServiceState, Transition};

/// Owns the current [`ServiceState`] of one service.
///
/// The state lives in a single atomic. Reads are one load; writes go through
/// [`apply`](Self::apply), which re-validates the edge on every compare-and-swap
/// retry, so concurrent writers can never skip a table check.
#[derive(Debug)]
pub struct ServiceStateMachine {
    kind: ServiceKind,
    state: AtomicU8,
}

impl ServiceStateMachine {
    /// Create a machine in the `Stopped` state.
    #[must_use]
    pub const fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            state: AtomicU8::new(ServiceState::Stopped.to_u8()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Current state (non-blocking).
    pub fn current(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Fire `event` and report what happened.
    ///
    /// Events without an edge from the current state leave it untouched and
    /// return `changed == false`.
    pub fn apply(&self, event: Lifecycle) -> Transition {
        let mut raw = self.state.load(Ordering::Acquire);
        loop {
            let from = ServiceState::from_u8(raw);
            let Some(to) = from.next(self.kind, event) else {
                return Transition::unchanged(from);
            };
            if to == from {
                return Transition::unchanged(from);
            }
            match self.state.compare_exchange_weak(
                raw,
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Transition {
                        from,
                        to,
                        changed: true,
                    };
                }
                Err(actual) => raw = actual,
            }
        }
    }
}
