//! Shell-backed implementation of the process launcher port.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use clawvisor_core::{ProcessError, ProcessLauncher, ServiceKind, ServiceProcess};
use tracing::{debug, info, warn};

use super::handle::ProcessHandle;
use super::shutdown::kill_by_name;
use crate::command::{safe_working_dir, shell_command};

/// Launches service commands through `sh -c` / `cmd /C`.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    working_dir: PathBuf,
}

impl ShellLauncher {
    /// Launcher that starts children in `working_dir`, or in the safe default
    /// directory when `None`.
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.unwrap_or_else(safe_working_dir),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Spawn `command` and return the concrete handle.
    pub fn spawn_handle(
        &self,
        kind: ServiceKind,
        command: &str,
    ) -> Result<ProcessHandle, ProcessError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ProcessError::InvalidCommand(format!(
                "empty command line for {kind}"
            )));
        }

        debug!(%kind, %command, dir = %self.working_dir.display(), "Spawning service");
        let child = shell_command(command, &self.working_dir)
            .spawn()
            .map_err(|e| ProcessError::StartFailed(format!("{command}: {e}")))?;

        let handle = ProcessHandle::new(kind, child);
        info!(%kind, pid = ?handle.pid(), "Service process spawned");
        Ok(handle)
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    async fn spawn(
        &self,
        kind: ServiceKind,
        command: &str,
    ) -> Result<Arc<dyn ServiceProcess>, ProcessError> {
        let handle = self.spawn_handle(kind, command)?;
        Ok(Arc::new(handle))
    }

    async fn sweep(&self, image_names: &[String]) -> usize {
        if image_names.is_empty() {
            return 0;
        }
        let names = image_names.to_vec();
        match tokio::task::spawn_blocking(move || kill_by_name(&names)).await {
            Ok(killed) => killed,
            Err(e) => {
                warn!(error = %e, "Process sweep task failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let launcher = ShellLauncher::default();
        let err = launcher
            .spawn(ServiceKind::Gateway, "   ")
            .await
            .err()
            .expect("blank command must fail");
        assert!(matches!(err, ProcessError::InvalidCommand(_)));
    }

    #[tokio::test]
    async fn sweep_with_no_names_kills_nothing() {
        assert_eq!(ShellLauncher::default().sweep(&[]).await, 0);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn spawned_handle_reports_kind_and_output() {
        use futures_util::StreamExt;

        let launcher = ShellLauncher::new(Some(PathBuf::from("/")));
        assert_eq!(launcher.working_dir(), Path::new("/"));

        let handle = tokio_test::assert_ok!(launcher.spawn(ServiceKind::Node, "echo started").await);
        assert_eq!(handle.kind(), ServiceKind::Node);
        let lines: Vec<String> = handle.lines().unwrap().collect().await;
        assert_eq!(lines, vec!["started"]);
    }
}
