//! Gateway liveness over HTTP.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Single-request HTTP liveness check.
///
/// Any HTTP response counts as alive, error statuses included: the Gateway
/// answers `/` with whatever its router returns, and all that matters is
/// that the listener is up.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Option<Client>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .build();

        let client = match client {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Failed to build probe HTTP client; gateway will read as down");
                None
            }
        };

        Self { client, timeout }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` if anything at `url` answered within the timeout.
    pub async fn probe(&self, url: &str) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        match client.get(url).send().await {
            Ok(response) => {
                debug!(%url, status = %response.status(), "Gateway probe answered");
                true
            }
            Err(e) => {
                debug!(%url, error = %e, "Gateway probe failed");
                false
            }
        }
    }
}
