//! `clawvisor detect`: find an installed service CLI.

use std::time::Duration;

use anyhow::Result;
use clawvisor_runtime::{CLI_CANDIDATES, detect_cli};

use crate::error::CliError;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Candidates in probe order: the configured CLI first, then the known names.
pub fn candidates(configured: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .into_iter()
        .collect();
    for name in CLI_CANDIDATES {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub async fn execute(configured: Option<&str>, json: bool) -> Result<()> {
    let names = candidates(configured);
    let Some(found) = detect_cli(&names, VERSION_TIMEOUT).await else {
        return Err(CliError::Process(format!("none of {} answered --version", names.join(", "))).into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        println!("{} {}", found.command, found.version);
    }
    Ok(())
}
