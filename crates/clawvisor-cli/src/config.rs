//! Settings layering for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the JSON settings file,
//! `CLAWVISOR_*` environment variables, command-line flags. The last two are
//! resolved together by clap (a flag beats its variable); `.env` files are
//! loaded into the environment before parsing.

use std::path::Path;

use clawvisor_core::{LaunchSettings, SupervisorConfig};

use crate::error::CliError;
use crate::parser::Cli;

/// Read a JSON settings file.
pub fn read_settings_file(path: &Path) -> Result<LaunchSettings, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}

/// Merge every settings layer for this invocation.
pub fn load_settings(cli: &Cli) -> Result<LaunchSettings, CliError> {
    let mut settings = LaunchSettings::default();
    if let Some(path) = &cli.config {
        settings.merge(read_settings_file(path)?);
    }
    settings.merge(cli.launch.to_settings());
    Ok(settings)
}

/// Merge, validate and render the supervisor configuration.
pub fn resolve_config(cli: &Cli) -> Result<SupervisorConfig, CliError> {
    Ok(load_settings(cli)?.into_config()?)
}
