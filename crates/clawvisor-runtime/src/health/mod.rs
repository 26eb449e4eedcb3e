//! Readiness probes for the Gateway and the Node.
//!
//! Both probes are side-effect free and cheap enough to run on the monitor's
//! interval. Neither ever returns an error: failures fold into a negative
//! answer and are only visible in the tracing log.

mod http;
mod status;

use std::sync::Arc;

use async_trait::async_trait;
use clawvisor_core::{ConnectionState, HealthProbe, SupervisorConfig};

pub use http::HttpProbe;
pub use status::{CliStatusProbe, StatusReport, classify_status_output};

/// The production [`HealthProbe`]: HTTP for the Gateway, the status command
/// for the Node.
#[derive(Debug, Clone)]
pub struct DefaultHealthProbe {
    http: HttpProbe,
    status: CliStatusProbe,
    probe_url: String,
}

impl DefaultHealthProbe {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            http: HttpProbe::new(config.probe_timeout),
            status: CliStatusProbe::new(
                config.status_command.clone(),
                config.status_timeout,
                config.working_dir.clone(),
            ),
            probe_url: config.probe_url.clone(),
        }
    }

    /// Convenience for wiring into a supervisor.
    pub fn shared(config: &SupervisorConfig) -> Arc<dyn HealthProbe> {
        Arc::new(Self::new(config))
    }

    pub fn status_probe(&self) -> &CliStatusProbe {
        &self.status
    }
}

#[async_trait]
impl HealthProbe for DefaultHealthProbe {
    async fn gateway_alive(&self) -> bool {
        self.http.probe(&self.probe_url).await
    }

    async fn node_connection(&self) -> ConnectionState {
        self.status.probe().await
    }
}
