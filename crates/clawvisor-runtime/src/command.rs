//! Shell command construction for service processes.
//!
//! Service commands are configured as full command lines (for example
//! `openclaw node run --host 127.0.0.1 --port 18789`) and always run through
//! an intermediary shell. That shell is why tear-down has to kill the whole
//! process tree rather than a single pid.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// `CREATE_NO_WINDOW` process creation flag.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Directory children are started in when none is configured.
///
/// The user's home directory, falling back to the filesystem root. Never the
/// launcher's own directory, which may be read-only or removed on update.
pub fn safe_working_dir() -> PathBuf {
    dirs::home_dir()
        .filter(|home| home.is_dir())
        .unwrap_or_else(filesystem_root)
}

#[cfg(windows)]
fn filesystem_root() -> PathBuf {
    PathBuf::from("C:\\")
}

#[cfg(not(windows))]
fn filesystem_root() -> PathBuf {
    PathBuf::from("/")
}

/// Build a shell invocation for `command_line`.
///
/// stdout and stderr are both piped, stdin is closed, no console window is
/// created on Windows, and on Unix the child leads its own process group so
/// the whole tree can be signalled at once.
pub fn shell_command(command_line: &str, working_dir: &Path) -> Command {
    let mut std_cmd = base_shell(command_line);
    std_cmd
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        std_cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

#[cfg(unix)]
fn base_shell(command_line: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn base_shell(command_line: &str) -> std::process::Command {
    use std::os::windows::process::CommandExt;

    let mut cmd = std::process::Command::new("cmd");
    cmd.arg("/C").raw_arg(command_line);
    cmd
}
