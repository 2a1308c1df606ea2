//! Harvest module - multi-source event acquisition and reconciliation.
//!
//! This module provides the harvesting half of the system:
//! - **Sources**: protocol adapters behind [`EventSource`](crate::traits::EventSource)
//! - **Registry**: the ordered set of sources a run draws from, via [`SourceRegistry`]
//! - **Reconcile**: dedup, past filter and per-source cap over normalized events
//! - **Pipeline**: the orchestrator via [`pipeline::HarvestPipeline`]

pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod sources;

// Re-export commonly used types
pub use pipeline::{HarvestOptions, HarvestPipeline, HarvestResult, HarvestStats, PipelineError};
pub use reconcile::{deduplicate_events, filter_past_events, limit_events_per_source};
pub use registry::{default_catalog, SourceRegistry};
pub use sources::{build_source, CalendarSource, FeedSource, HttpFetcher, ScraperSource};
