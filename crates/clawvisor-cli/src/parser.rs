//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::{Args, Parser};
use clawvisor_core::LaunchSettings;

use crate::commands::Commands;

/// Command-line interface for the Gateway/Node supervisor.
#[derive(Parser)]
#[command(name = "clawvisor")]
#[command(about = "Start, watch and stop the Gateway and Node services")]
#[command(version)]
pub struct Cli {
    /// JSON settings file layered under environment and flags
    #[arg(long, global = true, env = "CLAWVISOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub launch: LaunchArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Launch settings that can be given as flags or `CLAWVISOR_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Service CLI used to build the default commands
    #[arg(long, global = true, env = "CLAWVISOR_CLI")]
    pub cli: Option<String>,

    /// Host the Gateway listens on
    #[arg(long, global = true, env = "CLAWVISOR_HOST")]
    pub host: Option<String>,

    /// Gateway port
    #[arg(long, global = true, env = "CLAWVISOR_PORT")]
    pub port: Option<u16>,

    /// Display name the Node registers with
    #[arg(long = "display-name", global = true, env = "CLAWVISOR_DISPLAY_NAME")]
    pub display_name: Option<String>,

    /// Full Gateway command line
    #[arg(long = "gateway-command", global = true, env = "CLAWVISOR_GATEWAY_COMMAND")]
    pub gateway_command: Option<String>,

    /// Full Node command line
    #[arg(long = "node-command", global = true, env = "CLAWVISOR_NODE_COMMAND")]
    pub node_command: Option<String>,

    /// Full status command line
    #[arg(long = "status-command", global = true, env = "CLAWVISOR_STATUS_COMMAND")]
    pub status_command: Option<String>,

    /// Gateway readiness polls before giving up
    #[arg(long = "startup-attempts", global = true, env = "CLAWVISOR_STARTUP_ATTEMPTS")]
    pub startup_attempts: Option<u32>,

    /// Node connection polls before giving up
    #[arg(long = "node-attempts", global = true, env = "CLAWVISOR_NODE_ATTEMPTS")]
    pub node_attempts: Option<u32>,

    /// Delay between readiness polls, in milliseconds
    #[arg(long = "poll-interval-ms", global = true, env = "CLAWVISOR_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Working directory for the services
    #[arg(long = "working-dir", global = true, env = "CLAWVISOR_WORKING_DIR")]
    pub working_dir: Option<PathBuf>,
}

impl LaunchArgs {
    /// Flags as a settings layer; unset flags stay `None`.
    pub fn to_settings(&self) -> LaunchSettings {
        LaunchSettings {
            cli: self.cli.clone(),
            host: self.host.clone(),
            port: self.port,
            display_name: self.display_name.clone(),
            gateway_command: self.gateway_command.clone(),
            node_command: self.node_command.clone(),
            status_command: self.status_command.clone(),
            startup_attempts: self.startup_attempts,
            node_attempts: self.node_attempts,
            poll_interval_ms: self.poll_interval_ms,
            working_dir: self.working_dir.clone(),
            ..LaunchSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "clawvisor",
            "--verbose",
            "--cli",
            "openclaw-cn",
            "status",
            "--port",
            "20000",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.launch.cli.as_deref(), Some("openclaw-cn"));
        assert_eq!(cli.launch.port, Some(20000));
        assert!(matches!(cli.command, Some(Commands::Status { .. })));
    }

    #[test]
    fn test_unset_flags_leave_settings_empty() {
        let cli = Cli::parse_from(["clawvisor", "--node-attempts", "7"]);
        let settings = cli.launch.to_settings();
        assert_eq!(settings.node_attempts, Some(7));
        assert!(settings.cli.is_none());
        assert!(settings.port.is_none());
    }
}
