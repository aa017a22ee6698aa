//! One reading fetch: check credentials, log in, read connections
//!
//! Every fetch negotiates its own session. Nothing is cached between calls,
//! so fetches running side by side cannot see each other's host or token.

use std::time::Duration;

use log::info;
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::reading::{NormalizedReading, ReadingResolver};
use crate::session::{SessionNegotiator, MAX_REDIRECTS};
use crate::transport::{Transport, REQUEST_TIMEOUT};

pub struct LibreClient<T: Transport> {
    transport: T,
    timeout: Duration,
    max_redirects: usize,
}

impl<T: Transport> LibreClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: REQUEST_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
        }
    }

    pub async fn fetch_reading(&self, config: &Config) -> Result<NormalizedReading> {
        let credentials = config.credentials()?;

        let mut negotiator = SessionNegotiator::new(&self.transport, config.client_version.as_str())
            .max_redirects(self.max_redirects)
            .timeout(self.timeout);
        if let Some(code) = config.region.as_deref().filter(|c| !c.trim().is_empty()) {
            negotiator = negotiator.start_region(code)?;
        }

        let session = negotiator.authenticate(&credentials).await?;
        info!("Authenticated at {}", session.region_host);

        ReadingResolver::new(&self.transport)
            .timeout(self.timeout)
            .resolve(&session, config)
            .await
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

/// The single JSON object printed for the widget
pub fn render(result: &Result<NormalizedReading>) -> Result<Value> {
    match result {
        Ok(reading) => Ok(serde_json::to_value(reading)?),
        Err(e) => Ok(e.to_json()),
    }
}
