//! Node connection status via the CLI's status command.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use clawvisor_core::{ConnectionState, ProcessError};
use regex::Regex;
use tracing::{debug, warn};

use crate::command::{safe_working_dir, shell_command};
use crate::process::shutdown::kill_tree;

/// Marker printed by newer CLIs when at least one node is paired.
const PAIRED_MARKER: &str = "paired · connected";

static CONNECTED_COUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Connected:\s*[1-9]").ok());

/// Classify captured status output.
///
/// Connected iff the output reports a non-zero `Connected:` count or carries
/// the paired marker.
pub fn classify_status_output(output: &str) -> ConnectionState {
    let counted = CONNECTED_COUNT
        .as_ref()
        .is_some_and(|re| re.is_match(output));

    if counted || output.contains(PAIRED_MARKER) {
        ConnectionState::Connected
    } else {
        ConnectionState::Disconnected
    }
}

/// Outcome of one status command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: ConnectionState,
    /// Captured stdout, trimmed.
    pub stdout: String,
    /// Captured stderr, trimmed.
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs the status command with a bounded timeout.
#[derive(Debug, Clone)]
pub struct CliStatusProbe {
    command: String,
    timeout: Duration,
    working_dir: PathBuf,
}

impl CliStatusProbe {
    pub fn new(command: impl Into<String>, timeout: Duration, working_dir: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            timeout,
            working_dir: working_dir.unwrap_or_else(safe_working_dir),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command once and classify it.
    ///
    /// Only a successful exit can be `Connected`. Launch failures and
    /// timeouts are errors here; [`probe`](Self::probe) folds them away.
    pub async fn report(&self) -> Result<StatusReport, ProcessError> {
        let child = shell_command(&self.command, &self.working_dir)
            .spawn()
            .map_err(|e| ProcessError::StartFailed(format!("{}: {e}", self.command)))?;
        let pid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| ProcessError::Internal(format!("{}: {e}", self.command)))?
            }
            Err(_) => {
                // Dropping the future only kills the shell; the group it led
                // may still hold forked children.
                if let Some(pid) = pid {
                    if let Err(e) = tokio::task::spawn_blocking(move || kill_tree(pid)).await {
                        warn!(pid, error = %e, "Status command tree kill failed");
                    }
                }
                return Err(ProcessError::Internal(format!(
                    "status command timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let state = if output.status.success() {
            classify_status_output(&stdout)
        } else {
            ConnectionState::Disconnected
        };

        Ok(StatusReport {
            state,
            stdout,
            stderr,
            exit_code: output.status.code(),
        })
    }

    /// Current node connection; never fails.
    pub async fn probe(&self) -> ConnectionState {
        match self.report().await {
            Ok(report) => {
                debug!(state = %report.state, exit_code = ?report.exit_code, "Status probe");
                report.state
            }
            Err(e) => {
                warn!(command = %self.command, error = %e, "Status probe failed");
                ConnectionState::Disconnected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connected_count() {
        assert_eq!(
            classify_status_output("Nodes: 1\nConnected: 1\n"),
            ConnectionState::Connected
        );
        assert_eq!(
            classify_status_output("Connected:12"),
            ConnectionState::Connected
        );
    }

    #[test]
    fn zero_connected_is_disconnected() {
        assert_eq!(
            classify_status_output("Nodes: 1\nConnected: 0\n"),
            ConnectionState::Disconnected
        );
        assert_eq!(classify_status_output(""), ConnectionState::Disconnected);
    }

    #[test]
    fn classifies_paired_marker() {
        assert_eq!(
            classify_status_output("desk-node  paired · connected  v1.2.0"),
            ConnectionState::Connected
        );
        assert_eq!(
            classify_status_output("desk-node  paired · offline"),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn successful_command_is_classified() {
        let probe = CliStatusProbe::new("echo 'Connected: 2'", Duration::from_secs(5), None);
        let report = probe.report().await.unwrap();
        assert_eq!(report.state, ConnectionState::Connected);
        assert_eq!(report.stdout, "Connected: 2");
        assert_eq!(report.exit_code, Some(0));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_exit_is_disconnected_even_with_marker() {
        let probe = CliStatusProbe::new("echo 'Connected: 1'; exit 1", Duration::from_secs(5), None);
        assert_eq!(probe.probe().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn hung_command_times_out_as_disconnected() {
        let probe = CliStatusProbe::new("sleep 10", Duration::from_millis(100), None);
        assert!(probe.report().await.is_err());
        assert_eq!(probe.probe().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn timeout_kills_forked_children() {
        use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleep.pid");
        let command = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let probe = CliStatusProbe::new(command, Duration::from_millis(300), None);

        assert!(probe.report().await.is_err());

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let alive = system
            .process(Pid::from_u32(pid))
            .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie));
        assert!(!alive, "forked status child {pid} survived the timeout");
    }
}
