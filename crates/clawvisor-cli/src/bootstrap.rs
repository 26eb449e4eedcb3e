//! CLI bootstrap: the composition root.
//!
//! The only place where settings are resolved and the runtime is wired
//! together. Handlers receive a ready [`CliContext`].

use std::sync::Arc;

use clawvisor_core::SupervisorConfig;
use clawvisor_runtime::{EventSink, EventStream, Supervisor};
use tracing_subscriber::EnvFilter;

use crate::config::resolve_config;
use crate::error::CliError;
use crate::parser::Cli;

/// Install the operator log on stderr.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub config: Arc<SupervisorConfig>,
}

impl CliContext {
    /// A supervisor wired to real processes plus the consumer end of its
    /// event channel.
    pub fn supervisor(&self) -> (Arc<Supervisor>, EventStream) {
        let (sink, events) = EventSink::channel();
        let supervisor = Supervisor::with_defaults(Arc::clone(&self.config), sink);
        (Arc::new(supervisor), events)
    }
}

/// Resolve settings and build the context.
pub fn bootstrap(cli: &Cli) -> Result<CliContext, CliError> {
    let config = resolve_config(cli)?;
    tracing::debug!(?config, "Resolved supervisor configuration");
    Ok(CliContext {
        config: Arc::new(config),
    })
}
