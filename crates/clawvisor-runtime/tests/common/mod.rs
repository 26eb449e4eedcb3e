//! Hand-written fakes for supervisor integration tests.
//!
//! No real processes or sockets: the launcher hands out [`FakeProcess`]es
//! whose liveness the test flips, and the probe answers from scripts.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clawvisor_core::{
    ConnectionState, HealthProbe, LineStream, ProcessError, ProcessLauncher, ServiceKind,
    ServiceProcess, SupervisorConfig, SupervisorEvent,
};
use clawvisor_runtime::{EventSink, EventStream, Supervisor};
use futures_util::StreamExt;
use futures_util::stream;

// ── Fake process ───────────────────────────────────────────────────

pub struct FakeProcess {
    kind: ServiceKind,
    pid: u32,
    alive: AtomicBool,
    code: Mutex<Option<i32>>,
    output: Mutex<Option<Vec<String>>>,
    pub terminations: AtomicUsize,
}

impl FakeProcess {
    fn new(kind: ServiceKind, pid: u32, output: Vec<String>) -> Self {
        Self {
            kind,
            pid,
            alive: AtomicBool::new(true),
            code: Mutex::new(None),
            output: Mutex::new(Some(output)),
            terminations: AtomicUsize::new(0),
        }
    }

    /// Simulate the process exiting on its own.
    pub fn exit(&self, code: i32) {
        *self.code.lock().unwrap() = Some(code);
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn terminated(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceProcess for FakeProcess {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn lines(&self) -> Option<LineStream> {
        let lines = self.output.lock().unwrap().take()?;
        Some(stream::iter(lines).boxed())
    }

    fn exit_code(&self) -> Option<i32> {
        *self.code.lock().unwrap()
    }

    async fn terminate(&self) -> bool {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.terminations.fetch_add(1, Ordering::SeqCst);
        *self.code.lock().unwrap() = Some(-9);
        true
    }
}

// ── Fake launcher ──────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeLauncher {
    spawned: Mutex<Vec<Arc<FakeProcess>>>,
    commands: Mutex<Vec<(ServiceKind, String)>>,
    failing: Mutex<Vec<ServiceKind>>,
    spawn_delay: Mutex<Option<Duration>>,
    output: Mutex<Vec<String>>,
    pub sweeps: AtomicUsize,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every spawn of `kind` fail.
    pub fn fail(&self, kind: ServiceKind) {
        self.failing.lock().unwrap().push(kind);
    }

    /// Make every spawn take `delay` to complete.
    pub fn delay_spawns(&self, delay: Duration) {
        *self.spawn_delay.lock().unwrap() = Some(delay);
    }

    /// Lines each spawned process prints.
    pub fn print(&self, lines: &[&str]) {
        *self.output.lock().unwrap() = lines.iter().map(ToString::to_string).collect();
    }

    pub fn spawn_count(&self, kind: ServiceKind) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn commands(&self) -> Vec<(ServiceKind, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn processes(&self, kind: ServiceKind) -> Vec<Arc<FakeProcess>> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect()
    }

    pub fn last(&self, kind: ServiceKind) -> Arc<FakeProcess> {
        self.processes(kind)
            .pop()
            .unwrap_or_else(|| panic!("no {kind} process was spawned"))
    }

    pub fn live_count(&self, kind: ServiceKind) -> usize {
        self.processes(kind).iter().filter(|p| p.is_alive()).count()
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn spawn(
        &self,
        kind: ServiceKind,
        command: &str,
    ) -> Result<Arc<dyn ServiceProcess>, ProcessError> {
        self.commands
            .lock()
            .unwrap()
            .push((kind, command.to_string()));

        let delay = *self.spawn_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&kind) {
            return Err(ProcessError::StartFailed(format!("{command}: not found")));
        }

        let output = self.output.lock().unwrap().clone();
        let mut spawned = self.spawned.lock().unwrap();
        let pid = 1000 + u32::try_from(spawned.len()).unwrap();
        let process = Arc::new(FakeProcess::new(kind, pid, output));
        spawned.push(Arc::clone(&process));
        Ok(process)
    }

    async fn sweep(&self, _image_names: &[String]) -> usize {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        0
    }
}

// ── Scripted probe ─────────────────────────────────────────────────

/// Answers from a per-service script, then from a sticky default.
#[derive(Default)]
pub struct ScriptedProbe {
    gateway_script: Mutex<VecDeque<bool>>,
    gateway_default: AtomicBool,
    node_script: Mutex<VecDeque<bool>>,
    node_default: AtomicBool,
    node_delay: Mutex<Option<Duration>>,
    pub gateway_calls: AtomicUsize,
    pub node_calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue Gateway answers consumed one per probe.
    pub fn script_gateway(&self, answers: &[bool]) {
        self.gateway_script.lock().unwrap().extend(answers);
    }

    pub fn set_gateway(&self, alive: bool) {
        self.gateway_default.store(alive, Ordering::SeqCst);
    }

    pub fn script_node(&self, answers: &[bool]) {
        self.node_script.lock().unwrap().extend(answers);
    }

    pub fn set_node(&self, connected: bool) {
        self.node_default.store(connected, Ordering::SeqCst);
    }

    /// Make every node check take `delay`, like a slow status command.
    pub fn delay_node(&self, delay: Duration) {
        *self.node_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn gateway_alive(&self) -> bool {
        self.gateway_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.gateway_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.gateway_default.load(Ordering::SeqCst))
    }

    async fn node_connection(&self) -> ConnectionState {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.node_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.node_script.lock().unwrap().pop_front();
        if scripted.unwrap_or_else(|| self.node_default.load(Ordering::SeqCst)) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

// ── Harness ────────────────────────────────────────────────────────

/// Config with millisecond polling so budgets run out quickly.
pub fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        poll_interval: Duration::from_millis(2),
        startup_attempts: 30,
        node_attempts: 40,
        monitor_fast_interval: Duration::from_millis(5),
        monitor_slow_interval: Duration::from_millis(10),
        ..SupervisorConfig::default()
    }
}

pub struct Harness {
    pub supervisor: Arc<Supervisor>,
    pub launcher: Arc<FakeLauncher>,
    pub probe: Arc<ScriptedProbe>,
    pub events: EventStream,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: SupervisorConfig) -> Self {
        let (sink, events) = EventSink::channel();
        let launcher = FakeLauncher::new();
        let probe = ScriptedProbe::new();
        let supervisor = Arc::new(Supervisor::new(
            Arc::new(config),
            launcher.clone(),
            probe.clone(),
            sink,
        ));
        Self {
            supervisor,
            launcher,
            probe,
            events,
        }
    }

    /// Every event delivered so far.
    pub fn drain(&mut self) -> Vec<SupervisorEvent> {
        self.events.drain()
    }
}

/// State transitions of `kind`, as `(from, to)` labels.
pub fn transitions(events: &[SupervisorEvent], kind: ServiceKind) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(SupervisorEvent::as_state)
        .filter(|change| change.service == kind)
        .map(|change| (change.from.to_string(), change.to.to_string()))
        .collect()
}

/// Texts of log events with `severity`.
pub fn logs(events: &[SupervisorEvent], severity: clawvisor_core::Severity) -> Vec<String> {
    events
        .iter()
        .filter_map(SupervisorEvent::as_log)
        .filter(|log| log.severity == severity)
        .map(|log| log.text.clone())
        .collect()
}
