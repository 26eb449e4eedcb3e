//! Per-service bookkeeping: state machine, current handle, start flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clawvisor_core::{
    Lifecycle, ServiceKind, ServiceProcess, ServiceState, ServiceStateMachine, Transition,
};

type Handle = Arc<dyn ServiceProcess>;

/// Everything the supervisor tracks for one service.
///
/// The handle mutex is only ever held for a few field operations, never
/// across an `.await`.
pub(crate) struct ServiceSlot {
    kind: ServiceKind,
    pub(crate) machine: ServiceStateMachine,
    handle: Mutex<Option<Handle>>,
    /// Serialises apply + publish so state records leave in transition order.
    transitions: Mutex<()>,
    starting: AtomicBool,
}

impl ServiceSlot {
    pub(crate) const fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            machine: ServiceStateMachine::new(kind),
            handle: Mutex::new(None),
            transitions: Mutex::new(()),
            starting: AtomicBool::new(false),
        }
    }

    pub(crate) const fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub(crate) fn state(&self) -> ServiceState {
        self.machine.current()
    }

    /// Apply `event` and hand the result to `publish` before any other
    /// transition of this slot can land.
    ///
    /// `publish` must not block or touch this slot's transitions.
    pub(crate) fn transition(
        &self,
        event: Lifecycle,
        publish: impl FnOnce(Transition),
    ) -> Transition {
        let _order = self
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let transition = self.machine.apply(event);
        publish(transition);
        transition
    }

    fn lock(&self) -> MutexGuard<'_, Option<Handle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current handle if its process is still running.
    pub(crate) fn live_handle(&self) -> Option<Handle> {
        self.lock().as_ref().filter(|h| h.is_alive()).cloned()
    }

    /// Remove and return the handle, whatever its state.
    ///
    /// Concurrent callers race for it; exactly one wins.
    pub(crate) fn take(&self) -> Option<Handle> {
        self.lock().take()
    }

    /// Remove and return the handle only if its process has exited.
    pub(crate) fn take_if_dead(&self) -> Option<Handle> {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|h| !h.is_alive()) {
            slot.take()
        } else {
            None
        }
    }

    /// Install a freshly spawned handle if the service is still `Starting`.
    ///
    /// The state check and the store happen under the slot lock, and a stop
    /// moves the state to `Stopped` before it takes the handle, so a handle
    /// is either installed and later taken by that stop, or rejected here.
    /// A rejected handle is given back so the caller can terminate it.
    pub(crate) fn install_if_starting(&self, handle: Handle) -> Result<(), Handle> {
        let mut slot = self.lock();
        if self.machine.current() != ServiceState::Starting {
            return Err(handle);
        }
        if slot.as_ref().is_some_and(|h| h.is_alive()) {
            return Err(handle);
        }
        *slot = Some(handle);
        Ok(())
    }

    /// Claim the start-in-progress flag.
    ///
    /// Returns `None` if another start already holds it.
    pub(crate) fn try_begin_start(&self) -> Option<StartGuard<'_>> {
        self.starting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| StartGuard {
                flag: &self.starting,
            })
    }

    pub(crate) fn is_start_in_progress(&self) -> bool {
        self.starting.load(Ordering::Acquire)
    }
}

/// Scope guard that clears the start flag on drop.
///
/// Every exit path of a start, early returns included, releases the flag.
pub(crate) struct StartGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
