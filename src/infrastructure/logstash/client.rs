use crate::domain::errors::ScrapeError;
use crate::domain::ports::StatsSource;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const NODE_STATS_PATH: &str = "/_node/stats";

/// Node stats URL for a `host[:port]` target. A target that already carries a scheme is kept.
pub fn node_stats_url(host: &str) -> anyhow::Result<Url> {
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    Url::parse(&base)
        .and_then(|url| url.join(NODE_STATS_PATH))
        .context(format!("Invalid Logstash host: {}", host))
}

/// HTTP client for one Logstash node stats endpoint
pub struct LogstashClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl LogstashClient {
    pub fn new(host: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = node_stats_url(host)?.to_string();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    fn connection_error(&self, error: &reqwest::Error) -> ScrapeError {
        let reason = if error.is_timeout() {
            format!("timed out after {:?}", self.timeout)
        } else {
            error_chain(error)
        };
        ScrapeError::Connection {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}

#[async_trait]
impl StatsSource for LogstashClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<Vec<u8>, ScrapeError> {
        debug!(endpoint = %self.endpoint, "Fetching node stats");

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Protocol {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.connection_error(&e))?;

        Ok(body.to_vec())
    }
}

/// `reqwest` hides the interesting part (refused, DNS) in the source chain.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
