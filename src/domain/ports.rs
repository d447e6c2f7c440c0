use crate::domain::errors::ScrapeError;
use async_trait::async_trait;

/// Source of raw `/_node/stats` payloads.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Endpoint the payload comes from, used in logs.
    fn endpoint(&self) -> &str;

    /// Fetches the raw response body. Never retries.
    async fn fetch(&self) -> Result<Vec<u8>, ScrapeError>;
}
