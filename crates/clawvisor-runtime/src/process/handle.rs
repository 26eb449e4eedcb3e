//! Handle to one spawned service process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use clawvisor_core::{LineStream, ServiceKind, ServiceProcess};
use tokio::process::Child;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::shutdown::kill_tree;
use super::stream::{merge_output, read_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitState {
    Running,
    Exited(Option<i32>),
}

impl ExitState {
    const fn code(self) -> Option<i32> {
        match self {
            Self::Running => None,
            Self::Exited(code) => code,
        }
    }
}

/// A running service process backed by `tokio::process`.
///
/// The `Child` itself is owned by a waiter task that reaps it and clears the
/// liveness flag, so `is_alive` is a single atomic load and never blocks.
pub struct ProcessHandle {
    kind: ServiceKind,
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
    terminated: AtomicBool,
    exit: watch::Receiver<ExitState>,
    output: Mutex<Option<LineStream>>,
    kill_token: CancellationToken,
}

impl ProcessHandle {
    /// Take ownership of a freshly spawned child.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(kind: ServiceKind, mut child: Child) -> Self {
        let pid = child.id();
        let stdout = child.stdout.take().map(|out| read_lines(out, "stdout"));
        let stderr = child.stderr.take().map(|err| read_lines(err, "stderr"));

        let alive = Arc::new(AtomicBool::new(true));
        let (exit_tx, exit_rx) = watch::channel(ExitState::Running);
        let kill_token = CancellationToken::new();

        tokio::spawn(reap(
            kind,
            child,
            Arc::clone(&alive),
            exit_tx,
            kill_token.clone(),
        ));

        Self {
            kind,
            pid,
            alive,
            terminated: AtomicBool::new(false),
            exit: exit_rx,
            output: Mutex::new(Some(merge_output(stdout, stderr))),
            kill_token,
        }
    }

    /// Wait until the process has exited and been reaped.
    pub async fn wait_exit(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        match exit
            .wait_for(|state| matches!(state, ExitState::Exited(_)))
            .await
        {
            Ok(state) => state.code(),
            // Waiter task is gone (runtime shutting down)
            Err(_) => None,
        }
    }
}

/// Own the child until it exits or a kill is requested, then reap it.
async fn reap(
    kind: ServiceKind,
    mut child: Child,
    alive: Arc<AtomicBool>,
    exit_tx: watch::Sender<ExitState>,
    kill_token: CancellationToken,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        () = kill_token.cancelled() => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            // The tree kill already went out; this only covers the shell itself.
            if let Err(e) = child.start_kill() {
                debug!(%kind, error = %e, "start_kill after tree kill failed");
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(%kind, error = %e, "Error waiting for process");
            None
        }
    };

    debug!(%kind, ?code, "Process reaped");
    alive.store(false, Ordering::Release);
    exit_tx.send_replace(ExitState::Exited(code));
}

#[async_trait]
impl ServiceProcess for ProcessHandle {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn lines(&self) -> Option<LineStream> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit.borrow().code()
    }

    async fn terminate(&self) -> bool {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return false;
        }
        if !self.is_alive() {
            return false;
        }

        if let Some(pid) = self.pid {
            match tokio::task::spawn_blocking(move || kill_tree(pid)).await {
                Ok(killed) => debug!(kind = %self.kind, pid, killed, "Issued tree kill"),
                Err(e) => warn!(kind = %self.kind, pid, error = %e, "Tree kill task failed"),
            }
        }
        self.kill_token.cancel();
        true
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // A handle never outlives its process: dropping it kills the child.
        self.kill_token.cancel();
    }
}
