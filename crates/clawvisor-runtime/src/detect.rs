//! Locate the service CLI on `PATH` and read its version.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::command::{safe_working_dir, shell_command};

/// CLI names tried in order when none is configured.
pub const CLI_CANDIDATES: [&str; 2] = ["openclaw", "openclaw-cn"];

/// Raw output shorter than this is shown as the version when no semver is found.
const RAW_VERSION_MAX: usize = 30;

static VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"v?(\d+\.\d+\.\d+(?:-[\w\d]+)?)").ok());

/// A CLI that answered `--version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedCli {
    pub command: String,
    pub version: String,
}

/// Extract a version from `--version` output.
///
/// Prefers a semantic version (`1.2.3`, `v1.2.3-beta`); falls back to the
/// trimmed output itself when it is short enough to be a bare version.
pub fn parse_version(output: &str) -> Option<String> {
    let output = output.trim();
    if output.is_empty() {
        return None;
    }

    let semver = VERSION
        .as_ref()
        .and_then(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    semver.or_else(|| (output.len() < RAW_VERSION_MAX).then(|| output.to_string()))
}

/// Run `<command> --version` and parse the result.
pub async fn probe_version(command: &str, timeout: Duration) -> Option<String> {
    let line = format!("{command} --version");
    let run = shell_command(&line, &safe_working_dir()).output();

    let output = match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(%command, error = %e, "Version probe failed to launch");
            return None;
        }
        Err(_) => {
            debug!(%command, "Version probe timed out");
            return None;
        }
    };

    if !output.status.success() {
        debug!(%command, code = ?output.status.code(), "Version probe exited with failure");
        return None;
    }
    parse_version(&String::from_utf8_lossy(&output.stdout))
}

/// First candidate that answers `--version`.
pub async fn detect_cli<S: AsRef<str>>(candidates: &[S], timeout: Duration) -> Option<DetectedCli> {
    for candidate in candidates {
        let command = candidate.as_ref();
        if let Some(version) = probe_version(command, timeout).await {
            debug!(%command, %version, "Found CLI");
            return Some(DetectedCli {
                command: command.to_string(),
                version,
            });
        }
    }
    None
}
