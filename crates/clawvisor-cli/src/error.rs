//! CLI-specific error types and exit codes.

use clawvisor_core::{ConfigError, ProcessError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error (settings file missing, unreadable, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Settings failed to parse or validate.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A service command could not be run.
    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Map error to an exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 74,      // EX_IOERR
            Self::Config(_) => 78,  // EX_CONFIG
            Self::Process(_) => 71, // EX_OSERR
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        Self::Process(err.to_string())
    }
}
