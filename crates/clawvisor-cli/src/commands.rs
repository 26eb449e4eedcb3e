//! CLI subcommand definitions.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start both services and stream their events until Ctrl-C (default)
    Run {
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Probe the Gateway and print the Node status report once
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find an installed service CLI and print its version
    Detect {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run { json: false }
    }
}
