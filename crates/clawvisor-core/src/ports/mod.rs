//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the supervisor expects from
//! infrastructure. They contain no implementation details and use only domain
//! types.

mod probe;
mod process;

use thiserror::Error;

pub use probe::{ConnectionState, HealthProbe};
pub use process::{LineStream, ProcessLauncher, ServiceProcess};

/// Domain-specific errors for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The command could not be launched (missing executable, permissions).
    #[error("Failed to start: {0}")]
    StartFailed(String),

    /// The command line is empty or otherwise unusable.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Internal process error.
    #[error("Internal error: {0}")]
    Internal(String),
}
