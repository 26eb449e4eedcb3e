//! Kill a process together with every descendant it spawned.

use std::collections::HashSet;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Kill `pid` and its whole descendant tree.
///
/// # Strategy
/// 1. Snapshot the descendants first; once the root dies its children are
///    re-parented and the link is lost
/// 2. Unix: SIGKILL the process group led by `pid` (children are spawned as
///    group leaders)
/// 3. Kill the root and every snapshotted descendant individually, which
///    catches children that left the group (and is the only path on Windows)
///
/// Blocking: refreshes the system process table. Call from `spawn_blocking`.
///
/// Returns the number of processes a kill was issued for.
pub fn kill_tree(pid: u32) -> usize {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let root = Pid::from_u32(pid);
    let descendants = descendants_of(&system, root);
    debug!(pid, descendants = descendants.len(), "Killing process tree");

    #[cfg(unix)]
    kill_group(pid);

    let mut killed = 0;
    for target in std::iter::once(root).chain(descendants) {
        if let Some(process) = system.process(target) {
            if process.kill() {
                killed += 1;
            }
        }
    }
    killed
}

/// Collect every transitive child of `root` in the snapshot.
pub fn descendants_of(system: &System, root: Pid) -> Vec<Pid> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut frontier = vec![root];

    while let Some(parent) = frontier.pop() {
        for (pid, process) in system.processes() {
            if process.parent() == Some(parent) && seen.insert(*pid) {
                found.push(*pid);
                frontier.push(*pid);
            }
        }
    }
    found
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match signal::killpg(NixPid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(pid, error = %e, "killpg failed"),
    }
}
