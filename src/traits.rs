use crate::model::{NormalizedEvent, RawEvent, SourceConfig};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Source '{source_name}' timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },
    #[error("Failed to parse feed: {0}")]
    Feed(String),
    #[error("Failed to parse calendar: {0}")]
    Calendar(String),
    #[error("Invalid selector '{0}'")]
    Selector(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Event rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Static descriptor this adapter was built from.
    fn config(&self) -> &SourceConfig;

    /// Performs one acquisition round trip and parses the result.
    ///
    /// Errors are absorbed by [`SourceExecutor`](crate::executor::SourceExecutor),
    /// never by the caller's harvest.
    async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError>;

    fn name(&self) -> &str {
        &self.config().name
    }
}

/// Turns one raw event into the canonical schema.
pub trait EventNormalizer: Send + Sync {
    fn normalize(
        &self,
        raw: &RawEvent,
        config: &SourceConfig,
    ) -> Result<NormalizedEvent, NormalizeError>;
}
