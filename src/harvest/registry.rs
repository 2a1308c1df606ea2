//! Ordered, name-keyed collection of source adapters.

use crate::harvest::sources::{build_source, HttpFetcher};
use crate::model::{Jurisdiction, SourceConfig, SourceProtocol, SourceType};
use crate::traits::EventSource;
use std::sync::Arc;

/// Built-in source descriptors, in harvest order.
pub fn default_catalog() -> Vec<(SourceProtocol, SourceConfig)> {
    vec![
        (
            SourceProtocol::Feed,
            SourceConfig::new(
                "pa-house-committee",
                "https://www.legis.state.pa.us/WU01/LI/RSS/CMSH.xml",
                Jurisdiction::State,
                "PA",
                SourceType::LegislatureCommittee,
                "Pennsylvania House of Representatives",
            ),
        ),
        (
            SourceProtocol::Feed,
            SourceConfig::new(
                "pa-house-calendar",
                "https://www.legis.state.pa.us/WU01/LI/RSS/CAL/HouseCalendarSS0reg.xml",
                Jurisdiction::State,
                "PA",
                SourceType::LegislatureCalendar,
                "Pennsylvania House of Representatives",
            ),
        ),
        (
            SourceProtocol::Calendar,
            SourceConfig::new(
                "ca-state-board",
                "https://www.calendarwiz.com/CalendarWiz_iCal.php?crd=technology&cid=technology",
                Jurisdiction::State,
                "CA",
                SourceType::Executive,
                "California Technology Board",
            ),
        ),
        (
            SourceProtocol::Scraper,
            SourceConfig::new(
                "ny-tech-meetings",
                "https://meetny.webex.com/webappng/sites/meetny/dashboard?siteurl=meetny",
                Jurisdiction::State,
                "NY",
                SourceType::Executive,
                "New York Technology Services",
            )
            .with_selector(".meeting-card"),
        ),
        (
            SourceProtocol::Feed,
            SourceConfig::new(
                "wa-ocio-blog",
                "https://ocio.wa.gov/rss.xml",
                Jurisdiction::State,
                "WA",
                SourceType::Executive,
                "Washington Office of the Chief Information Officer",
            ),
        ),
    ]
}

/// Registry of adapters. Constructed explicitly and handed to the pipeline.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn EventSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in catalog.
    pub fn with_defaults(http: &HttpFetcher) -> Self {
        let mut registry = Self::new();
        for (protocol, config) in default_catalog() {
            registry.add_source(build_source(protocol, config, http.clone()));
        }
        registry
    }

    /// Adds a source, replacing any existing source with the same name.
    pub fn add_source(&mut self, source: Arc<dyn EventSource>) {
        match self.sources.iter().position(|s| s.name() == source.name()) {
            Some(index) => self.sources[index] = source,
            None => self.sources.push(source),
        }
    }

    /// Returns all sources, or only the named ones when `names` is non-empty.
    ///
    /// Unknown names are ignored. Registry order is kept either way.
    pub fn get_all_sources(&self, names: Option<&[String]>) -> Vec<Arc<dyn EventSource>> {
        match names {
            Some(names) if !names.is_empty() => self
                .sources
                .iter()
                .filter(|source| names.iter().any(|name| name == source.name()))
                .cloned()
                .collect(),
            _ => self.sources.clone(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
