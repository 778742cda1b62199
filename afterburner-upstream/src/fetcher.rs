use afterburner_core::config::UpstreamConfig;
use afterburner_core::error::ScrapeError;
use std::sync::Arc;
use tracing::warn;

use crate::client::{ClientError, MonitorClient, UpstreamRequest, UpstreamResponse};

/// Fetches `/mahm`, retrying transport failures up to a fixed budget.
///
/// Non-2xx answers are returned as-is; deciding what to do with them is the
/// caller's job.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn MonitorClient>,
    request: UpstreamRequest,
    path: String,
    max_attempts: u32,
}

impl Fetcher {
    pub fn new(config: &UpstreamConfig, client: Arc<dyn MonitorClient>) -> Self {
        Self {
            client,
            request: UpstreamRequest {
                url: config.url(),
                username: config.username.clone(),
                password: config.password.clone(),
            },
            path: config.path.clone(),
            max_attempts: config.max_attempts(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub async fn fetch(&self) -> Result<UpstreamResponse, ScrapeError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.client.get(&self.request).await {
                Ok(resp) => return Ok(resp),
                Err(ClientError::Request(detail)) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        path = %self.path,
                        error = %detail,
                        "Upstream request failed"
                    );
                    last_error = detail;
                }
                Err(ClientError::Body(detail)) => {
                    return Err(ScrapeError::Body {
                        path: self.path.clone(),
                        detail,
                    });
                }
            }
        }

        Err(ScrapeError::Transport {
            path: self.path.clone(),
            detail: last_error,
        })
    }
}
