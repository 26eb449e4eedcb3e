//! Fallback kill by process image name.

use std::ffi::OsStr;

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Kill every process whose image name matches one of `image_names`.
///
/// Names match with or without a trailing `.exe`, case-insensitively on
/// Windows. The calling process is never targeted. Blocking; call from
/// `spawn_blocking`.
///
/// Returns the number of processes a kill was issued for.
pub fn kill_by_name(image_names: &[String]) -> usize {
    let wanted: Vec<String> = image_names
        .iter()
        .map(|name| normalize(name))
        .filter(|name| !name.is_empty())
        .collect();
    if wanted.is_empty() {
        return 0;
    }

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let own_pid = sysinfo::get_current_pid().ok();

    let mut killed = 0;
    for (pid, process) in system.processes() {
        if Some(*pid) == own_pid {
            continue;
        }
        if matches_any(process.name(), &wanted) && process.kill() {
            debug!(pid = %pid, name = ?process.name(), "Swept stray process");
            killed += 1;
        }
    }
    killed
}

fn matches_any(name: &OsStr, wanted: &[String]) -> bool {
    let name = normalize(&name.to_string_lossy());
    wanted.iter().any(|w| *w == name)
}

fn normalize(name: &str) -> String {
    let name = name.trim();
    let lower = name.to_ascii_lowercase();
    let stem = lower.strip_suffix(".exe").unwrap_or(&lower);

    if cfg!(windows) {
        stem.to_string()
    } else {
        // Case matters on Unix; only the suffix is stripped.
        name[..stem.len()].to_string()
    }
}
