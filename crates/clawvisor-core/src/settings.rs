//! Launch settings and the immutable supervisor configuration.
//!
//! [`LaunchSettings`] is the user-facing, all-optional shape that adapters
//! merge from files, environment and flags. [`LaunchSettings::into_config`]
//! validates it and renders the concrete command lines into a
//! [`SupervisorConfig`], which is read-only for the rest of the run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// CLI used to launch both services when none is configured.
pub const DEFAULT_CLI: &str = "openclaw";

/// Host the Gateway listens on.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the Gateway listens on.
pub const DEFAULT_GATEWAY_PORT: u16 = 18789;

/// Display name the Node registers with.
pub const DEFAULT_DISPLAY_NAME: &str = "clawvisor-node";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_STARTUP_ATTEMPTS: u32 = 30;
const DEFAULT_NODE_ATTEMPTS: u32 = 40;
const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MONITOR_FAST: Duration = Duration::from_millis(1500);
const DEFAULT_MONITOR_SLOW: Duration = Duration::from_secs(3);
const DEFAULT_SUSPEND_QUIET: Duration = Duration::from_millis(300);

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be at least 1")]
    ZeroAttempts(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Probe URL must start with http:// or https://, got {0}")]
    InvalidProbeUrl(String),

    #[error("Monitor slow interval ({slow_ms}ms) is shorter than the fast interval ({fast_ms}ms)")]
    IntervalOrder { fast_ms: u64, slow_ms: u64 },
}

/// User-facing launch settings.
///
/// All fields are optional to support layered sources and graceful defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    /// CLI executable used to derive the default commands.
    pub cli: Option<String>,
    /// Host the Gateway listens on.
    pub host: Option<String>,
    /// Port the Gateway listens on.
    pub port: Option<u16>,
    /// Display name passed to the Node.
    pub display_name: Option<String>,

    /// Full Gateway command line (overrides the CLI-derived one).
    pub gateway_command: Option<String>,
    /// Full Node command line (overrides the CLI-derived one).
    pub node_command: Option<String>,
    /// Full status command line (overrides the CLI-derived one).
    pub status_command: Option<String>,
    /// Liveness probe URL (overrides the host/port-derived one).
    pub probe_url: Option<String>,

    pub probe_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    /// Gateway readiness polls before giving up.
    pub startup_attempts: Option<u32>,
    /// Node connection polls before giving up.
    pub node_attempts: Option<u32>,
    pub status_timeout_ms: Option<u64>,
    pub monitor_fast_ms: Option<u64>,
    pub monitor_slow_ms: Option<u64>,
    pub suspend_quiet_ms: Option<u64>,

    /// Image names killed by the fallback sweep on stop.
    pub sweep_images: Option<Vec<String>>,
    /// Working directory for spawned processes.
    pub working_dir: Option<PathBuf>,
}

impl LaunchSettings {
    /// Overlay `other` on top of `self`; only `Some` fields in `other` win.
    pub fn merge(&mut self, other: Self) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            };
        }

        overlay!(
            cli,
            host,
            port,
            display_name,
            gateway_command,
            node_command,
            status_command,
            probe_url,
            probe_timeout_ms,
            poll_interval_ms,
            startup_attempts,
            node_attempts,
            status_timeout_ms,
            monitor_fast_ms,
            monitor_slow_ms,
            suspend_quiet_ms,
            sweep_images,
            working_dir,
        );
    }

    /// Effective CLI name.
    #[must_use]
    pub fn effective_cli(&self) -> &str {
        self.cli
            .as_deref()
            .map(str::trim)
            .filter(|cli| !cli.is_empty())
            .unwrap_or(DEFAULT_CLI)
    }

    /// Validate and render the immutable supervisor configuration.
    pub fn into_config(self) -> Result<SupervisorConfig, ConfigError> {
        let config = self.render();
        config.validate()?;
        Ok(config)
    }

    fn render(self) -> SupervisorConfig {
        let cli = self.effective_cli().to_string();
        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = self.port.unwrap_or(DEFAULT_GATEWAY_PORT);
        let display_name = self
            .display_name
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        SupervisorConfig {
            gateway_command: self
                .gateway_command
                .unwrap_or_else(|| format!("{cli} gateway")),
            node_command: self.node_command.unwrap_or_else(|| {
                format!("{cli} node run --host {host} --port {port} --display-name \"{display_name}\"")
            }),
            status_command: self
                .status_command
                .unwrap_or_else(|| format!("{cli} nodes status")),
            probe_url: self
                .probe_url
                .unwrap_or_else(|| format!("http://{host}:{port}/")),
            probe_timeout: millis_or(self.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT),
            poll_interval: millis_or(self.poll_interval_ms, DEFAULT_POLL_INTERVAL),
            startup_attempts: self.startup_attempts.unwrap_or(DEFAULT_STARTUP_ATTEMPTS),
            node_attempts: self.node_attempts.unwrap_or(DEFAULT_NODE_ATTEMPTS),
            status_timeout: millis_or(self.status_timeout_ms, DEFAULT_STATUS_TIMEOUT),
            monitor_fast_interval: millis_or(self.monitor_fast_ms, DEFAULT_MONITOR_FAST),
            monitor_slow_interval: millis_or(self.monitor_slow_ms, DEFAULT_MONITOR_SLOW),
            suspend_quiet: millis_or(self.suspend_quiet_ms, DEFAULT_SUSPEND_QUIET),
            sweep_images: self.sweep_images.unwrap_or_else(|| vec![cli.clone()]),
            working_dir: self.working_dir,
        }
    }
}

fn millis_or(value: Option<u64>, default: Duration) -> Duration {
    value.map_or(default, Duration::from_millis)
}

/// Immutable configuration for the supervisor and monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub gateway_command: String,
    pub node_command: String,
    pub status_command: String,
    pub probe_url: String,
    pub probe_timeout: Duration,
    /// Delay between readiness polls during startup.
    pub poll_interval: Duration,
    pub startup_attempts: u32,
    pub node_attempts: u32,
    /// Upper bound for one run of the status command.
    pub status_timeout: Duration,
    /// Monitor delay while the Node is not connected.
    pub monitor_fast_interval: Duration,
    /// Monitor delay once the Node is connected.
    pub monitor_slow_interval: Duration,
    /// Quiet period before a debounced suspend resumes.
    pub suspend_quiet: Duration,
    pub sweep_images: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        LaunchSettings::default().render()
    }
}

impl SupervisorConfig {
    /// Check invariants that the supervisor relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("gateway_command", &self.gateway_command),
            ("node_command", &self.node_command),
            ("status_command", &self.status_command),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }

        if !(self.probe_url.starts_with("http://") || self.probe_url.starts_with("https://")) {
            return Err(ConfigError::InvalidProbeUrl(self.probe_url.clone()));
        }

        if self.startup_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("startup_attempts"));
        }
        if self.node_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("node_attempts"));
        }

        for (name, value) in [
            ("probe_timeout", self.probe_timeout),
            ("poll_interval", self.poll_interval),
            ("status_timeout", self.status_timeout),
            ("monitor_fast_interval", self.monitor_fast_interval),
            ("monitor_slow_interval", self.monitor_slow_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        if self.monitor_slow_interval < self.monitor_fast_interval {
            return Err(ConfigError::IntervalOrder {
                fast_ms: duration_ms(self.monitor_fast_interval),
                slow_ms: duration_ms(self.monitor_slow_interval),
            });
        }

        Ok(())
    }

    /// Total time the Gateway is given to become ready.
    #[must_use]
    pub fn startup_budget(&self) -> Duration {
        self.poll_interval * self.startup_attempts
    }
}

fn duration_ms(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}
