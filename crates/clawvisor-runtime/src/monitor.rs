//! Background reconciliation loop.
//!
//! Re-probes both services on an adaptive interval: fast while the Node is
//! not yet connected, slow once it is. The loop only stops when its quit
//! token fires; a panicking tick is reported on the event sink and the next
//! tick runs as usual.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use clawvisor_core::{ServiceKind, ServiceState};
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::supervisor::Supervisor;

pub struct MonitorLoop {
    supervisor: Arc<Supervisor>,
    quit: CancellationToken,
}

impl MonitorLoop {
    pub fn new(supervisor: Arc<Supervisor>, quit: CancellationToken) -> Self {
        Self { supervisor, quit }
    }

    /// Delay before the next tick given the current Node state.
    pub fn next_delay(&self) -> Duration {
        let config = self.supervisor.config();
        if self.supervisor.state(ServiceKind::Node) == ServiceState::Connected {
            config.monitor_slow_interval
        } else {
            config.monitor_fast_interval
        }
    }

    /// Run one reconcile pass, converting a panic into an error event.
    pub async fn tick(&self) {
        let pass = AssertUnwindSafe(self.supervisor.reconcile()).catch_unwind();
        if let Err(panic) = pass.await {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(%message, "Monitor tick panicked");
            self.supervisor
                .sink()
                .error(format!("Status monitor error: {message}"));
        }
    }

    /// Tick until the quit token fires.
    pub async fn run(self) {
        debug!("Status monitor started");
        loop {
            self.tick().await;

            let delay = self.next_delay();
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.quit.cancelled() => break,
            }
        }
        debug!("Status monitor stopped");
    }

    /// Run on a dedicated task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
