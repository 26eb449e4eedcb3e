//! Orchestration of the Gateway and Node lifecycles.
//!
//! The [`Supervisor`] owns one [`ServiceSlot`] per service and is the only
//! writer of their state machines. It never returns errors: everything the
//! user should see is published on the [`EventSink`], and the operations
//! return a plain [`StartOutcome`] / [`StopSummary`].
//!
//! # Start sequence
//!
//! 1. Claim the Gateway start flag (a concurrent start returns `InProgress`)
//! 2. Adopt a Gateway that already answers, otherwise spawn one and poll its
//!    HTTP endpoint for up to `startup_attempts × poll_interval`
//! 3. Only with the Gateway up, spawn the Node and poll the status command
//!    for up to `node_attempts × poll_interval`
//!
//! A stop at any point wins: the poll loops notice the service is no longer
//! `Starting` and bail out, and a handle spawned after the stop is killed
//! instead of installed.

mod outcome;
mod slot;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clawvisor_core::{
    HealthProbe, Lifecycle, LogEvent, ProcessLauncher, ServiceKind, ServiceProcess, ServiceState,
    Severity, SupervisorConfig,
};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::events::EventSink;
use crate::health::DefaultHealthProbe;
use crate::process::ShellLauncher;

pub use outcome::{StartOutcome, StatusSnapshot, StopSummary};
use slot::ServiceSlot;

type Handle = Arc<dyn ServiceProcess>;

/// Where a single-service start ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Up,
    Failed,
    Cancelled,
}

/// Starts, watches and stops the two dependent services.
pub struct Supervisor {
    config: Arc<SupervisorConfig>,
    launcher: Arc<dyn ProcessLauncher>,
    probe: Arc<dyn HealthProbe>,
    sink: EventSink,
    gateway: ServiceSlot,
    node: ServiceSlot,
    /// Set by `stop_all`, cleared by a start. Keeps the monitor from
    /// re-adopting a Gateway the user just asked to stop.
    held: AtomicBool,
}

impl Supervisor {
    pub fn new(
        config: Arc<SupervisorConfig>,
        launcher: Arc<dyn ProcessLauncher>,
        probe: Arc<dyn HealthProbe>,
        sink: EventSink,
    ) -> Self {
        Self {
            config,
            launcher,
            probe,
            sink,
            gateway: ServiceSlot::new(ServiceKind::Gateway),
            node: ServiceSlot::new(ServiceKind::Node),
            held: AtomicBool::new(false),
        }
    }

    /// Supervisor wired to the shell launcher and the HTTP/status probes.
    pub fn with_defaults(config: Arc<SupervisorConfig>, sink: EventSink) -> Self {
        let launcher = Arc::new(ShellLauncher::new(config.working_dir.clone()));
        let probe = DefaultHealthProbe::shared(&config);
        Self::new(config, launcher, probe, sink)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Current state of `kind` (non-blocking).
    pub fn state(&self, kind: ServiceKind) -> ServiceState {
        self.slot(kind).state()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            gateway: self.gateway.state(),
            node: self.node.state(),
        }
    }

    /// Whether a stop is holding the services down.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    const fn slot(&self, kind: ServiceKind) -> &ServiceSlot {
        match kind {
            ServiceKind::Gateway => &self.gateway,
            ServiceKind::Node => &self.node,
        }
    }

    /// Apply `event` to `slot` and publish the change, if any.
    fn fire(&self, slot: &ServiceSlot, event: Lifecycle) -> bool {
        let kind = slot.kind();
        slot.transition(event, |transition| {
            if transition.changed {
                debug!(
                    %kind,
                    ?event,
                    from = %transition.from,
                    to = %transition.to,
                    "State transition"
                );
            }
            self.sink.state_changed(kind, transition);
        })
        .changed
    }

    fn report(&self, severity: Severity, kind: ServiceKind, text: impl Into<String>) {
        self.sink.log(LogEvent::new(severity, text).with_service(kind));
    }

    /// Start the Gateway (or adopt a running one), then the Node.
    pub async fn start_all(&self) -> StartOutcome {
        let Some(guard) = self.gateway.try_begin_start() else {
            debug!("Start already in progress");
            return StartOutcome::InProgress;
        };
        self.held.store(false, Ordering::Release);

        match self.bring_up_gateway().await {
            Phase::Up => {}
            Phase::Failed => return StartOutcome::GatewayFailed,
            Phase::Cancelled => return StartOutcome::Cancelled,
        }
        drop(guard);

        self.start_node().await
    }

    async fn bring_up_gateway(&self) -> Phase {
        let slot = &self.gateway;

        if self.probe.gateway_alive().await {
            if slot.state().is_up() {
                debug!("Gateway already up");
                return Phase::Up;
            }
            return self.adopt(slot);
        }

        if slot.state().is_up() {
            // Marked up but no longer answering; start over from Stopped.
            self.fire(slot, Lifecycle::ObservedDead);
        }

        self.fire(slot, Lifecycle::StartRequested);
        if slot.state() != ServiceState::Starting {
            return Phase::Cancelled;
        }

        let handle = match slot.live_handle() {
            Some(handle) => {
                self.report(Severity::Info, slot.kind(), "Waiting for the existing Gateway process");
                handle
            }
            None => match self.spawn_into(slot, &self.config.gateway_command).await {
                Ok(handle) => handle,
                Err(phase) => return phase,
            },
        };

        self.report(Severity::Info, slot.kind(), "Waiting for the Gateway to become ready...");
        self.wait_until_ready(slot, &handle, self.config.startup_attempts)
            .await
    }

    /// Start the Node. Refused unless the Gateway is up.
    pub async fn start_node(&self) -> StartOutcome {
        let slot = &self.node;

        if !self.gateway.state().is_up() {
            debug!(gateway = %self.gateway.state(), "Node start refused");
            return StartOutcome::GatewayNotReady;
        }

        let Some(_guard) = slot.try_begin_start() else {
            return StartOutcome::InProgress;
        };
        self.held.store(false, Ordering::Release);

        if slot.live_handle().is_some() {
            debug!("Node already running");
            return StartOutcome::AlreadyRunning;
        }
        if let Some(dead) = slot.take_if_dead() {
            debug!(exit_code = ?dead.exit_code(), "Discarding exited Node handle");
        }
        if slot.state().is_up() {
            self.fire(slot, Lifecycle::ObservedDead);
        }

        self.fire(slot, Lifecycle::StartRequested);
        if slot.state() != ServiceState::Starting {
            return StartOutcome::Cancelled;
        }

        // The Gateway may have died while we were getting here.
        if !self.gateway.state().is_up() {
            self.fire(slot, Lifecycle::StopRequested);
            return StartOutcome::GatewayNotReady;
        }

        let handle = match self.spawn_into(slot, &self.config.node_command).await {
            Ok(handle) => handle,
            Err(Phase::Cancelled) => return StartOutcome::Cancelled,
            Err(_) => return StartOutcome::NodeFailed,
        };

        self.report(Severity::Info, slot.kind(), "Waiting for the Node to connect...");
        match self
            .wait_until_ready(slot, &handle, self.config.node_attempts)
            .await
        {
            Phase::Up => StartOutcome::Started,
            Phase::Failed => StartOutcome::NodeFailed,
            Phase::Cancelled => StartOutcome::Cancelled,
        }
    }

    /// Spawn `command` for a `Starting` slot and install the handle.
    async fn spawn_into(&self, slot: &ServiceSlot, command: &str) -> Result<Handle, Phase> {
        let kind = slot.kind();
        self.report(Severity::Cmd, kind, command);

        let handle = match self.launcher.spawn(kind, command).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%kind, error = %e, "Spawn failed");
                if self.fire(slot, Lifecycle::ExitedEarly) {
                    self.report(Severity::Error, kind, format!("Failed to start {kind}: {e}"));
                }
                return Err(Phase::Failed);
            }
        };

        if let Err(rejected) = slot.install_if_starting(Arc::clone(&handle)) {
            debug!(%kind, "Stop won the race; killing fresh handle");
            rejected.terminate().await;
            return Err(Phase::Cancelled);
        }

        info!(%kind, pid = ?handle.pid(), "Service spawned");
        self.pump_output(&handle);
        Ok(handle)
    }

    /// Forward the handle's output to the sink on its own task.
    fn pump_output(&self, handle: &Handle) {
        let Some(mut lines) = handle.lines() else {
            return;
        };
        let kind = handle.kind();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            while let Some(line) = lines.next().await {
                sink.log(LogEvent::new(Severity::Info, line).with_service(kind));
            }
            debug!(%kind, "Output stream closed");
        });
    }

    /// Readiness check for one service.
    async fn is_ready(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::Gateway => self.probe.gateway_alive().await,
            ServiceKind::Node => self.probe.node_connection().await.is_connected(),
        }
    }

    /// Poll until ready, exited, stopped or out of attempts.
    async fn wait_until_ready(&self, slot: &ServiceSlot, handle: &Handle, attempts: u32) -> Phase {
        let kind = slot.kind();

        for attempt in 1..=attempts {
            tokio::time::sleep(self.config.poll_interval).await;

            if slot.state() != ServiceState::Starting {
                // Stopped underneath us, or the monitor already saw it come up.
                return if slot.state().is_up() {
                    Phase::Up
                } else {
                    Phase::Cancelled
                };
            }

            if self.is_ready(kind).await {
                return self.mark_ready(slot);
            }

            if !handle.is_alive() {
                if self.fire(slot, Lifecycle::ExitedEarly) {
                    let code = handle
                        .exit_code()
                        .map_or_else(|| "unknown".to_string(), |c| c.to_string());
                    self.report(
                        Severity::Error,
                        kind,
                        format!("{kind} exited during startup (exit code {code})"),
                    );
                }
                slot.take_if_dead();
                return Phase::Failed;
            }

            if attempt % 10 == 0 {
                self.report(
                    Severity::Debug,
                    kind,
                    format!("Still waiting for {kind} ({attempt}/{attempts})"),
                );
            }
        }

        if self.fire(slot, Lifecycle::AttemptsExhausted) {
            let waited = self.config.poll_interval * attempts;
            warn!(%kind, attempts, "Startup timed out");
            self.report(
                Severity::Error,
                kind,
                format!("{kind} did not become ready within {}s", waited.as_secs_f32()),
            );
            return Phase::Failed;
        }

        if slot.state().is_up() {
            Phase::Up
        } else {
            Phase::Cancelled
        }
    }

    /// Starting → Ready/Connected, with the Node also lifting the Gateway.
    fn mark_ready(&self, slot: &ServiceSlot) -> Phase {
        let kind = slot.kind();
        if self.fire(slot, Lifecycle::ProbeSucceeded) {
            let text = match kind {
                ServiceKind::Gateway => "Gateway is ready",
                ServiceKind::Node => "Node connected to the Gateway",
            };
            info!(%kind, "{text}");
            self.report(Severity::Success, kind, text);
        }

        if !slot.state().is_up() {
            return Phase::Cancelled;
        }
        if kind == ServiceKind::Node {
            self.fire(&self.gateway, Lifecycle::DependentConnected);
        }
        Phase::Up
    }

    /// Take over a service that is already up without our handle.
    ///
    /// Never lifts a service out of `Stopped` while a stop is latched.
    fn adopt(&self, slot: &ServiceSlot) -> Phase {
        if slot.state().can_start() {
            if self.is_held() {
                return Phase::Cancelled;
            }
            self.fire(slot, Lifecycle::StartRequested);
            // A stop that latched after the check above still wins.
            if self.is_held() {
                self.fire(slot, Lifecycle::StopRequested);
                return Phase::Cancelled;
            }
            self.report(
                Severity::Info,
                slot.kind(),
                format!("{} is already running; attaching", slot.kind()),
            );
        }
        self.mark_ready(slot)
    }

    /// Stop both services and kill their process trees.
    ///
    /// Idempotent and safe to call concurrently: each handle is taken by
    /// exactly one caller. Returns once kills are issued, without waiting
    /// for the processes to exit.
    pub async fn stop_all(&self) -> StopSummary {
        self.held.store(true, Ordering::Release);

        let mut changed = false;
        for slot in [&self.node, &self.gateway] {
            changed |= self.fire(slot, Lifecycle::StopRequested);
        }

        let mut summary = StopSummary::default();
        for slot in [&self.node, &self.gateway] {
            let Some(handle) = slot.take() else {
                continue;
            };
            if handle.terminate().await {
                summary.terminated += 1;
                let pid = handle
                    .pid()
                    .map_or_else(|| "?".to_string(), |pid| pid.to_string());
                self.report(
                    Severity::Info,
                    slot.kind(),
                    format!("Stopped {} (pid {pid})", slot.kind()),
                );
            }
        }

        summary.swept = self.launcher.sweep(&self.config.sweep_images).await;
        if changed || summary.terminated > 0 {
            info!(terminated = summary.terminated, swept = summary.swept, "Services stopped");
            self.sink.info("All services stopped");
        }
        summary
    }

    /// One monitor pass: compare observed reality with the state machines.
    pub async fn reconcile(&self) {
        self.reconcile_gateway().await;
        self.reconcile_node().await;
    }

    async fn reconcile_gateway(&self) {
        let slot = &self.gateway;

        if let Some(dead) = slot.take_if_dead() {
            self.report(
                Severity::Debug,
                slot.kind(),
                format!("Gateway process exited (exit code {:?})", dead.exit_code()),
            );
        }

        let alive = self.probe.gateway_alive().await;
        let state = slot.state();

        if alive {
            if !state.is_up() && !self.is_held() && !slot.is_start_in_progress() {
                self.adopt(slot);
            } else if state == ServiceState::Starting {
                // A start is polling; finish its transition early.
                self.mark_ready(slot);
            }
        } else if state.is_up() && self.fire(slot, Lifecycle::ObservedDead) {
            warn!("Gateway stopped answering");
            self.report(Severity::Error, slot.kind(), "Gateway stopped unexpectedly");
        }
    }

    async fn reconcile_node(&self) {
        let slot = &self.node;

        if let Some(dead) = slot.take_if_dead() {
            let code = dead.exit_code();
            if slot.state().is_up() && self.fire(slot, Lifecycle::ObservedDead) {
                warn!(exit_code = ?code, "Node exited");
                self.report(
                    Severity::Error,
                    slot.kind(),
                    format!("Node exited unexpectedly (exit code {code:?})"),
                );
            } else if slot.state() == ServiceState::Starting
                && self.fire(slot, Lifecycle::ExitedEarly)
            {
                self.report(
                    Severity::Error,
                    slot.kind(),
                    format!("Node exited during startup (exit code {code:?})"),
                );
            }
        }

        if !self.gateway.state().is_up() {
            if slot.state() == ServiceState::Connected
                && self.fire(slot, Lifecycle::ObservedDead)
            {
                warn!("Gateway is down; Node no longer connected");
                self.report(Severity::Error, slot.kind(), "Node lost its Gateway");
            }
            return;
        }
        if slot.state() == ServiceState::Connected || self.is_held() {
            return;
        }
        let Some(probed) = slot.live_handle() else {
            return;
        };

        if !self.probe.node_connection().await.is_connected() {
            return;
        }

        // The status command may take seconds; a stop or restart in the
        // meantime invalidates what it saw.
        let same_process = slot
            .live_handle()
            .is_some_and(|current| Arc::ptr_eq(&current, &probed));
        if same_process && !self.is_held() && self.gateway.state().is_up() {
            self.adopt(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStream;
    use async_trait::async_trait;
    use clawvisor_core::{ConnectionState, ProcessError, SupervisorEvent};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Quiet;

    #[async_trait]
    impl HealthProbe for Quiet {
        async fn gateway_alive(&self) -> bool {
            false
        }
        async fn node_connection(&self) -> ConnectionState {
            ConnectionState::Disconnected
        }
    }

    struct BrokenLauncher {
        spawns: AtomicUsize,
    }

    #[async_trait]
    impl ProcessLauncher for BrokenLauncher {
        async fn spawn(&self, _kind: ServiceKind, command: &str) -> Result<Handle, ProcessError> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            Err(ProcessError::StartFailed(format!("{command}: not found")))
        }
        async fn sweep(&self, _image_names: &[String]) -> usize {
            0
        }
    }

    fn fast_config() -> Arc<SupervisorConfig> {
        Arc::new(SupervisorConfig {
            poll_interval: Duration::from_millis(1),
            startup_attempts: 3,
            node_attempts: 3,
            ..SupervisorConfig::default()
        })
    }

    fn supervisor() -> (Supervisor, Arc<BrokenLauncher>, EventStream) {
        let (sink, stream) = EventSink::channel();
        let launcher = Arc::new(BrokenLauncher {
            spawns: AtomicUsize::new(0),
        });
        let sup = Supervisor::new(fast_config(), launcher.clone(), Arc::new(Quiet), sink);
        (sup, launcher, stream)
    }

    fn errors(stream: &mut EventStream) -> Vec<String> {
        stream
            .drain()
            .iter()
            .filter_map(SupervisorEvent::as_log)
            .filter(|log| log.severity == Severity::Error)
            .map(|log| log.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn spawn_failure_marks_gateway_failed_once() {
        let (sup, launcher, mut stream) = supervisor();

        assert_eq!(sup.start_all().await, StartOutcome::GatewayFailed);
        assert_eq!(sup.state(ServiceKind::Gateway), ServiceState::Failed);
        assert_eq!(sup.state(ServiceKind::Node), ServiceState::Stopped);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 1);

        let errors = errors(&mut stream);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not found"));
    }

    #[tokio::test]
    async fn failed_gateway_can_be_restarted() {
        let (sup, launcher, _stream) = supervisor();
        sup.start_all().await;
        sup.start_all().await;
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn node_start_refused_without_gateway() {
        let (sup, launcher, _stream) = supervisor();
        assert_eq!(sup.start_node().await, StartOutcome::GatewayNotReady);
        assert_eq!(launcher.spawns.load(Ordering::SeqCst), 0);
        assert_eq!(sup.state(ServiceKind::Node), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn stop_when_idle_is_quiet() {
        let (sup, _launcher, mut stream) = supervisor();
        let summary = sup.stop_all().await;
        assert_eq!(summary, StopSummary::default());
        assert!(sup.is_held());
        assert!(stream.drain().is_empty());
    }

    #[tokio::test]
    async fn start_in_progress_keeps_the_hold() {
        let (sup, _launcher, _stream) = supervisor();
        sup.stop_all().await;

        let _busy = sup.gateway.try_begin_start().unwrap();
        assert_eq!(sup.start_all().await, StartOutcome::InProgress);
        assert!(sup.is_held());
    }

    #[tokio::test]
    async fn adopt_backs_off_while_held() {
        let (sup, _launcher, mut stream) = supervisor();
        sup.stop_all().await;

        assert_eq!(sup.adopt(&sup.gateway), Phase::Cancelled);
        assert_eq!(sup.state(ServiceKind::Gateway), ServiceState::Stopped);
        assert!(stream.drain().is_empty());
    }

    #[tokio::test]
    async fn start_clears_the_hold() {
        let (sup, _launcher, _stream) = supervisor();
        sup.stop_all().await;
        sup.start_all().await;
        assert!(!sup.is_held());
    }

    #[tokio::test]
    async fn snapshot_reflects_both_services() {
        let (sup, _launcher, _stream) = supervisor();
        sup.start_all().await;
        let snapshot = sup.snapshot();
        assert_eq!(snapshot.gateway, ServiceState::Failed);
        assert_eq!(snapshot.node, ServiceState::Stopped);
    }
}
