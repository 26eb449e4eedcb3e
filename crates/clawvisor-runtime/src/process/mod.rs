//! Service process management.
//!
//! Spawning through the shell, merged line output, liveness tracking and
//! tree tear-down.

mod handle;
mod launcher;
pub mod shutdown;
mod stream;

pub use handle::ProcessHandle;
pub use launcher::ShellLauncher;
pub use stream::{merge_output, read_lines};
