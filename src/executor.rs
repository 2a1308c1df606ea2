use crate::model::RawEvent;
use crate::traits::{EventSource, SourceError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Failure-isolation boundary around one adapter fetch.
///
/// Every error, including a hung adapter, becomes an empty batch.
pub struct SourceExecutor {
    fetch_timeout: Duration,
}

impl SourceExecutor {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self { fetch_timeout }
    }

    /// Fetches from `source`, returning the error instead of absorbing it.
    pub async fn try_execute(&self, source: &dyn EventSource) -> Result<Vec<RawEvent>, SourceError> {
        timeout(self.fetch_timeout, source.fetch_raw())
            .await
            .map_err(|_| SourceError::Timeout {
                source_name: source.name().to_string(),
                secs: self.fetch_timeout.as_secs(),
            })?
    }

    #[instrument(skip(self, source), fields(source = %source.name()))]
    pub async fn execute(&self, source: &dyn EventSource) -> Vec<RawEvent> {
        match self.try_execute(source).await {
            Ok(events) => {
                info!(count = events.len(), "Fetched raw events");
                events
            }
            Err(e) => {
                warn!(url = %source.config().url, error = %e, "Source fetch failed");
                Vec::new()
            }
        }
    }
}

impl Default for SourceExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Jurisdiction, SourceConfig, SourceType};
    use async_trait::async_trait;
    use chrono::Utc;

    struct SlowSource(SourceConfig);

    #[async_trait]
    impl EventSource for SlowSource {
        fn config(&self) -> &SourceConfig {
            &self.0
        }

        async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenSource(SourceConfig);

    #[async_trait]
    impl EventSource for BrokenSource {
        fn config(&self) -> &SourceConfig {
            &self.0
        }

        async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
            Err(SourceError::Feed("unexpected EOF".into()))
        }
    }

    struct OneEventSource(SourceConfig);

    #[async_trait]
    impl EventSource for OneEventSource {
        fn config(&self) -> &SourceConfig {
            &self.0
        }

        async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
            Ok(vec![RawEvent {
                source_id: "1".into(),
                title: "Board Meeting".into(),
                description: String::new(),
                date: Utc::now(),
                link: String::new(),
                location: None,
                category: None,
                source_data: None,
                source: self.0.name.clone(),
                agency: None,
            }])
        }
    }

    fn config(name: &str) -> SourceConfig {
        SourceConfig::new(
            name,
            "https://example.gov/feed",
            Jurisdiction::State,
            "ZZ",
            SourceType::Executive,
            "Agency",
        )
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let executor = SourceExecutor::new(Duration::from_millis(20));
        let result = executor.try_execute(&SlowSource(config("slow"))).await;

        match result {
            Err(SourceError::Timeout { source_name, .. }) => assert_eq!(source_name, "slow"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failures_become_empty_batches() {
        let executor = SourceExecutor::new(Duration::from_millis(20));
        assert!(executor.execute(&SlowSource(config("slow"))).await.is_empty());
        assert!(executor.execute(&BrokenSource(config("broken"))).await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_fetch_passes_through() {
        let executor = SourceExecutor::default();
        let events = executor.execute(&OneEventSource(config("ok"))).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "ok");
    }
}
