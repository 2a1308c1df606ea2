//! Harvest orchestrator.
//!
//! [`HarvestPipeline`] runs one harvest over the sources of a
//! [`SourceRegistry`]:
//! 1. **Fetch**: each source in registry order, one at a time, behind the
//!    [`SourceExecutor`] timeout
//! 2. **Normalize**: each raw event individually; failures drop that event
//! 3. **Reconcile**: dedup, then the optional past filter, then the per-source cap
//! 4. **Persist**: through the configured [`EventStore`] unless dry-running
//!
//! Source and event failures never fail the run. Only a missing store when
//! saving is requested, or a failing store, surfaces as [`PipelineError`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::executor::SourceExecutor;
use crate::harvest::reconcile::{deduplicate_events, filter_past_events, limit_events_per_source};
use crate::harvest::registry::SourceRegistry;
use crate::model::NormalizedEvent;
use crate::normalize::StandardNormalizer;
use crate::store::{EventStore, StoreError};
use crate::traits::EventNormalizer;

/// Logs at `info` when verbose, `debug` otherwise.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

// ============================================================================
// Pipeline Types
// ============================================================================

/// Options for a single harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Skip persistence
    pub dry_run: bool,

    /// Restrict the run to these source names; `None` or empty means all
    pub sources: Option<Vec<String>>,

    pub verbose: bool,

    pub save_results: bool,

    /// Drop events dated before the start of reconciliation
    pub filter_past: bool,

    pub max_events_per_source: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            sources: None,
            verbose: false,
            save_results: true,
            filter_past: true,
            max_events_per_source: 100,
        }
    }
}

impl HarvestOptions {
    fn persists(&self) -> bool {
        self.save_results && !self.dry_run
    }
}

/// Final event list plus what happened along the way.
#[derive(Debug)]
pub struct HarvestResult {
    /// Reconciled events, returned whether or not they were persisted
    pub events: Vec<NormalizedEvent>,

    pub stats: HarvestStats,
}

/// Statistics about a harvest run.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestStats {
    pub total_duration_ms: u64,

    pub fetch_duration_ms: u64,

    /// Sources selected for this run
    pub sources_attempted: usize,

    /// Sources that produced at least one raw event
    pub sources_with_events: usize,

    pub raw_events: usize,

    /// Raw events dropped by the normalizer
    pub normalize_failures: usize,

    pub after_dedup: usize,

    /// Events removed by the past filter
    pub past_events_dropped: usize,

    pub final_events: usize,

    /// Newly inserted events; `None` when nothing was persisted
    pub saved: Option<usize>,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Saving was requested but no store is configured
    #[error("Saving requested but no event store is configured")]
    MissingStore,

    #[error("Failed to persist events: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Harvest orchestrator.
///
/// # Example
///
/// ```ignore
/// use gov_event_harvester::harvest::{HarvestOptions, HarvestPipeline, SourceRegistry};
///
/// let pipeline = HarvestPipeline::new(registry)
///     .with_store(store)
///     .with_timeout(Duration::from_secs(60));
/// let result = pipeline.harvest_events(&HarvestOptions::default()).await?;
/// println!("{} events", result.events.len());
/// ```
pub struct HarvestPipeline {
    registry: SourceRegistry,

    normalizer: Box<dyn EventNormalizer>,

    store: Option<Arc<dyn EventStore>>,

    executor: SourceExecutor,

    /// Fixed reference instant for the past filter; `None` reads the clock
    as_of: Option<DateTime<Utc>>,
}

impl HarvestPipeline {
    /// Creates a pipeline over `registry` with the standard normalizer, no
    /// store and a two minute per-source timeout.
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry,
            normalizer: Box::new(StandardNormalizer),
            store: None,
            executor: SourceExecutor::new(Duration::from_secs(120)),
            as_of: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn EventNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the upper bound on a single source fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.executor = SourceExecutor::new(timeout);
        self
    }

    /// Pins "now" for the past-event filter.
    pub fn as_of(mut self, instant: DateTime<Utc>) -> Self {
        self.as_of = Some(instant);
        self
    }

    /// Runs one harvest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingStore`] before fetching anything when
    /// results should be saved but no store is configured, and
    /// [`PipelineError::Store`] when the store itself fails.
    pub async fn harvest_events(
        &self,
        options: &HarvestOptions,
    ) -> Result<HarvestResult, PipelineError> {
        let start = Instant::now();
        let mut stats = HarvestStats::default();
        let verbose = options.verbose;

        let store = match (options.persists(), &self.store) {
            (true, None) => return Err(PipelineError::MissingStore),
            (true, Some(store)) => Some(Arc::clone(store)),
            (false, _) => None,
        };

        // ====================================================================
        // Stage 1: Fetch + normalize
        // ====================================================================

        let sources = self.registry.get_all_sources(options.sources.as_deref());
        stats.sources_attempted = sources.len();
        progress!(verbose, sources = sources.len(), "Starting harvest");

        let fetch_start = Instant::now();
        let mut events = Vec::new();

        for source in &sources {
            progress!(verbose, source = %source.name(), url = %source.config().url, "Fetching source");
            let raw_events = self.executor.execute(source.as_ref()).await;
            if !raw_events.is_empty() {
                stats.sources_with_events += 1;
            }
            stats.raw_events += raw_events.len();

            let before = events.len();
            for raw in &raw_events {
                match self.normalizer.normalize(raw, source.config()) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        stats.normalize_failures += 1;
                        warn!(source = %source.name(), title = %raw.title, error = %e, "Skipping event that failed to normalize");
                    }
                }
            }
            progress!(
                verbose,
                source = %source.name(),
                raw = raw_events.len(),
                normalized = events.len() - before,
                "Source harvested"
            );
        }
        stats.fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

        // ====================================================================
        // Stage 2: Reconcile (order is fixed)
        // ====================================================================

        let mut events = deduplicate_events(events);
        stats.after_dedup = events.len();

        if options.filter_past {
            let now = self.as_of.unwrap_or_else(Utc::now);
            let before = events.len();
            events = filter_past_events(events, now);
            stats.past_events_dropped = before - events.len();
        }

        events = limit_events_per_source(events, options.max_events_per_source);
        stats.final_events = events.len();

        progress!(
            verbose,
            raw = stats.raw_events,
            after_dedup = stats.after_dedup,
            past_dropped = stats.past_events_dropped,
            kept = stats.final_events,
            "Reconciled events"
        );

        // ====================================================================
        // Stage 3: Persist
        // ====================================================================

        if let Some(store) = store {
            let saved = store.save_events(&events).await?;
            stats.saved = Some(saved);
            progress!(verbose, saved, total = events.len(), "Saved events");
        } else {
            progress!(verbose, dry_run = options.dry_run, "Skipping persistence");
        }

        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        Ok(HarvestResult { events, stats })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Jurisdiction, RawEvent, SourceConfig, SourceType};
    use crate::store::MemoryEventStore;
    use crate::traits::{EventSource, NormalizeError, SourceError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    // Mock source returning a fixed batch
    struct StaticSource {
        config: SourceConfig,
        events: Vec<RawEvent>,
    }

    #[async_trait]
    impl EventSource for StaticSource {
        fn config(&self) -> &SourceConfig {
            &self.config
        }

        async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
            Ok(self.events.clone())
        }
    }

    // Mock source that always fails
    struct FailingSource(SourceConfig);

    #[async_trait]
    impl EventSource for FailingSource {
        fn config(&self) -> &SourceConfig {
            &self.0
        }

        async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
            Err(SourceError::Feed("connection reset".into()))
        }
    }

    // Rejects events whose title mentions "malformed"
    struct PickyNormalizer;

    impl EventNormalizer for PickyNormalizer {
        fn normalize(
            &self,
            raw: &RawEvent,
            config: &SourceConfig,
        ) -> Result<NormalizedEvent, NormalizeError> {
            if raw.title.contains("malformed") {
                return Err(NormalizeError::Rejected(raw.title.clone()));
            }
            StandardNormalizer.normalize(raw, config)
        }
    }

    fn config(name: &str, agency: &str) -> SourceConfig {
        SourceConfig::new(
            name,
            format!("https://{name}.example.gov/feed"),
            Jurisdiction::State,
            "ZZ",
            SourceType::Executive,
            agency,
        )
    }

    fn raw(source: &str, agency: &str, title: &str, day: u32) -> RawEvent {
        RawEvent {
            source_id: format!("{source}-{title}-{day}"),
            title: title.to_string(),
            description: String::new(),
            date: Utc.with_ymd_and_hms(2030, 4, day, 10, 0, 0).unwrap(),
            link: format!("https://{source}.example.gov/{day}"),
            location: None,
            category: None,
            source_data: None,
            source: source.to_string(),
            agency: Some(agency.to_string()),
        }
    }

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.add_source(Arc::new(StaticSource {
            config: config("zz-alpha", "Alpha Agency"),
            events: vec![
                raw("zz-alpha", "Alpha Agency", "Kickoff", 1),
                raw("zz-alpha", "Alpha Agency", "malformed entry", 2),
            ],
        }));
        registry.add_source(Arc::new(FailingSource(config("zz-broken", "Broken Agency"))));
        registry.add_source(Arc::new(StaticSource {
            config: config("zz-beta", "Beta Agency"),
            events: vec![raw("zz-beta", "Beta Agency", "Review", 3)],
        }));
        registry
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let pipeline = HarvestPipeline::new(registry())
            .with_normalizer(Box::new(PickyNormalizer))
            .as_of(as_of());
        let options = HarvestOptions {
            dry_run: true,
            ..Default::default()
        };

        let result = pipeline.harvest_events(&options).await.unwrap();
        let titles: Vec<&str> = result.events.iter().map(|e| e.title.as_str()).collect();

        assert_eq!(titles, vec!["Kickoff", "Review"]);
        assert_eq!(result.stats.sources_attempted, 3);
        assert_eq!(result.stats.sources_with_events, 2);
        assert_eq!(result.stats.raw_events, 3);
        assert_eq!(result.stats.normalize_failures, 1);
        assert_eq!(result.stats.saved, None);
    }

    #[tokio::test]
    async fn test_saving_without_store_is_fatal() {
        let pipeline = HarvestPipeline::new(registry());
        let result = pipeline.harvest_events(&HarvestOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::MissingStore)));
    }

    #[tokio::test]
    async fn test_saves_through_store() {
        let store = Arc::new(MemoryEventStore::new());
        let pipeline = HarvestPipeline::new(registry())
            .with_store(store.clone())
            .as_of(as_of());

        let first = pipeline.harvest_events(&HarvestOptions::default()).await.unwrap();
        assert_eq!(first.stats.saved, Some(3));

        let second = pipeline.harvest_events(&HarvestOptions::default()).await.unwrap();
        assert_eq!(second.stats.saved, Some(0));
        assert_eq!(second.events.len(), 3);
        assert_eq!(store.get_all_events().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_source_subset() {
        let pipeline = HarvestPipeline::new(registry()).as_of(as_of());
        let options = HarvestOptions {
            save_results: false,
            sources: Some(vec!["zz-beta".into(), "zz-missing".into()]),
            ..Default::default()
        };

        let result = pipeline.harvest_events(&options).await.unwrap();
        assert_eq!(result.stats.sources_attempted, 1);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].agency, "Beta Agency");
    }

    #[tokio::test]
    async fn test_past_filter_toggle() {
        let late = Utc.with_ymd_and_hms(2030, 4, 2, 0, 0, 0).unwrap();
        let pipeline = HarvestPipeline::new(registry()).as_of(late);

        let filtered = HarvestOptions {
            dry_run: true,
            verbose: true,
            ..Default::default()
        };
        let result = pipeline.harvest_events(&filtered).await.unwrap();
        assert_eq!(result.stats.past_events_dropped, 1);
        assert_eq!(result.events.len(), 2);

        let unfiltered = HarvestOptions {
            filter_past: false,
            ..filtered
        };
        assert_eq!(pipeline.harvest_events(&unfiltered).await.unwrap().events.len(), 3);
    }

    fn single_source(events: Vec<RawEvent>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.add_source(Arc::new(StaticSource {
            config: config("zz-gamma", "Gamma Agency"),
            events,
        }));
        registry
    }

    fn capped(limit: usize) -> HarvestOptions {
        HarvestOptions {
            dry_run: true,
            max_events_per_source: limit,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cap_applies_after_past_filter() {
        let events = [1, 2, 3, 11, 12, 13]
            .into_iter()
            .map(|day| raw("zz-gamma", "Gamma Agency", &format!("Day {day}"), day))
            .collect();
        let pipeline = HarvestPipeline::new(single_source(events))
            .as_of(Utc.with_ymd_and_hms(2030, 4, 10, 0, 0, 0).unwrap());

        let result = pipeline.harvest_events(&capped(2)).await.unwrap();
        let titles: Vec<&str> = result.events.iter().map(|e| e.title.as_str()).collect();

        assert_eq!(titles, vec!["Day 11", "Day 12"]);
        assert_eq!(result.stats.past_events_dropped, 3);
    }

    #[tokio::test]
    async fn test_cap_applies_after_dedup() {
        let events = vec![
            raw("zz-gamma", "Gamma Agency", "Standup", 5),
            raw("zz-gamma", "Gamma Agency", "Standup", 5),
            raw("zz-gamma", "Gamma Agency", "Standup", 5),
            raw("zz-gamma", "Gamma Agency", "Retro", 6),
        ];
        let pipeline = HarvestPipeline::new(single_source(events)).as_of(as_of());

        let result = pipeline.harvest_events(&capped(2)).await.unwrap();
        let titles: Vec<&str> = result.events.iter().map(|e| e.title.as_str()).collect();

        assert_eq!(titles, vec!["Standup", "Retro"]);
        assert_eq!(result.stats.after_dedup, 2);
    }
}
