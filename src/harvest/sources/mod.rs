//! Source adapters, one per acquisition protocol.
//!
//! Each adapter pairs a [`SourceConfig`] with an [`HttpFetcher`] and keeps
//! parsing in a pure function so it can be exercised on fixture text:
//! - `feed` - RSS 2.0 syndication feeds
//! - `calendar` - iCalendar documents (VEVENT entries)
//! - `scraper` - HTML pages with per-source card selectors

pub mod calendar;
pub mod feed;
pub mod scraper;

pub use calendar::CalendarSource;
pub use feed::FeedSource;
pub use scraper::ScraperSource;

use crate::model::{SourceConfig, SourceProtocol};
use crate::traits::{EventSource, SourceError};
use std::sync::Arc;
use std::time::Duration;

/// Shared HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// GETs `url` and returns the body; non-2xx statuses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let url = reqwest::Url::parse(url).map_err(|e| SourceError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Builds the adapter for a configured source.
pub fn build_source(
    protocol: SourceProtocol,
    config: SourceConfig,
    http: HttpFetcher,
) -> Arc<dyn EventSource> {
    match protocol {
        SourceProtocol::Feed => Arc::new(FeedSource::new(config, http)),
        SourceProtocol::Calendar => Arc::new(CalendarSource::new(config, http)),
        SourceProtocol::Scraper => Arc::new(ScraperSource::new(config, http)),
    }
}
