//! `clawvisor run`: supervise until interrupted.
//!
//! This task is the single consumer of the event stream. Background work
//! (startup, monitor, output pumps) only ever enqueues events; everything the
//! user sees is printed from here.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clawvisor_core::SupervisorEvent;
use clawvisor_runtime::{EventStream, MonitorLoop, StartOutcome, SuspendDebouncer, Supervisor};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bootstrap::CliContext;
use crate::presentation::{format_event, format_event_json};

#[derive(Debug, Clone, Copy)]
pub struct RunArgs {
    pub json: bool,
}

/// Prints events to stdout in the selected format.
struct Printer {
    json: bool,
}

impl Printer {
    fn print(&self, event: &SupervisorEvent) {
        let line = if self.json {
            format_event_json(event)
        } else {
            format_event(event)
        };
        let mut stdout = std::io::stdout().lock();
        // A closed stdout (e.g. piped into `head`) is not worth dying over.
        let _ = writeln!(stdout, "{line}");
    }

    fn drain(&self, events: &mut EventStream) {
        for event in events.drain() {
            self.print(&event);
        }
    }
}

pub async fn execute(ctx: &CliContext, args: RunArgs) -> Result<()> {
    let (supervisor, mut events) = ctx.supervisor();
    let printer = Printer { json: args.json };
    let debouncer = SuspendDebouncer::new(supervisor.sink().clone(), ctx.config.suspend_quiet);

    let quit = CancellationToken::new();
    let monitor = MonitorLoop::new(Arc::clone(&supervisor), quit.clone()).spawn();
    let startup = spawn_startup(Arc::clone(&supervisor));

    let mut resize = ResizeSignal::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => printer.print(&event),
                None => break,
            },
            () = resize.recv() => {
                debug!("Terminal resized; suspending output");
                debouncer.trigger();
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Ctrl-C handler failed; shutting down");
                }
                break;
            }
        }
    }

    info!("Shutting down");
    quit.cancel();
    debouncer.flush();

    supervisor.sink().info("Stopping services...");
    supervisor.stop_all().await;
    // A start in flight sees the stop at its next poll and returns.
    if let Err(e) = startup.await {
        debug!(error = %e, "Startup task ended abnormally");
    }

    if let Err(e) = monitor.await {
        debug!(error = %e, "Monitor task ended abnormally");
    }
    printer.drain(&mut events);
    Ok(())
}

fn spawn_startup(supervisor: Arc<Supervisor>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = supervisor.start_all().await;
        debug!(%outcome, "Startup finished");
        if !outcome.is_success() && outcome != StartOutcome::Cancelled {
            supervisor
                .sink()
                .info(format!("Startup ended: {outcome}; the monitor keeps watching"));
        }
    })
}

/// Terminal resize notifications (SIGWINCH). Never fires elsewhere.
struct ResizeSignal {
    #[cfg(unix)]
    inner: Option<tokio::signal::unix::Signal>,
}

impl ResizeSignal {
    #[cfg(unix)]
    fn new() -> Self {
        use tokio::signal::unix::{SignalKind, signal};
        let inner = match signal(SignalKind::window_change()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                debug!(error = %e, "SIGWINCH unavailable");
                None
            }
        };
        Self { inner }
    }

    #[cfg(not(unix))]
    fn new() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        match &mut self.inner {
            Some(signal) => {
                if signal.recv().await.is_none() {
                    self.inner = None;
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        std::future::pending().await
    }
}
