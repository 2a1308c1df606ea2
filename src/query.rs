//! Filtering and ordering of stored events for display.

use crate::model::NormalizedEvent;
use crate::store::{EventStore, StoreError};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DateAsc,
    DateDesc,
    Title,
    JurisdictionThenDate,
}

impl SortKey {
    /// Parses `date`, `date-desc`, `title` or `jurisdiction`; anything else sorts by date.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "date-desc" => SortKey::DateDesc,
            "title" => SortKey::Title,
            "jurisdiction" => SortKey::JurisdictionThenDate,
            _ => SortKey::DateAsc,
        }
    }

    fn compare(&self, a: &NormalizedEvent, b: &NormalizedEvent) -> Ordering {
        match self {
            SortKey::DateAsc => a.date.cmp(&b.date),
            SortKey::DateDesc => b.date.cmp(&a.date),
            SortKey::Title => a
                .title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title)),
            SortKey::JurisdictionThenDate => a
                .jurisdiction
                .as_str()
                .cmp(b.jurisdiction.as_str())
                .then_with(|| a.date.cmp(&b.date)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// `None` or `"All"` disables the jurisdiction filter
    pub jurisdiction: Option<String>,
    pub tag: Option<String>,
    pub search_term: Option<String>,
    pub virtual_only: bool,
    pub sort: SortKey,
}

impl EventFilter {
    fn matches_search(event: &NormalizedEvent, terms: &[String]) -> bool {
        let title = event.title.to_lowercase();
        let description = event.description.to_lowercase();
        let agency = event.agency.to_lowercase();
        let location = event.location.to_lowercase();
        let tags: Vec<String> = event.tags.iter().map(|tag| tag.to_lowercase()).collect();

        terms.iter().all(|term| {
            title.contains(term.as_str())
                || description.contains(term.as_str())
                || agency.contains(term.as_str())
                || location.contains(term.as_str())
                || tags.iter().any(|tag| tag.contains(term.as_str()))
        })
    }

    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if let Some(jurisdiction) = self.jurisdiction.as_deref().filter(|j| *j != "All") {
            if event.jurisdiction.as_str() != jurisdiction {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !event.tags.contains(tag) {
                return false;
            }
        }
        if self.virtual_only && !event.is_virtual {
            return false;
        }
        match &self.search_term {
            Some(search) => {
                let terms: Vec<String> = search
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                Self::matches_search(event, &terms)
            }
            None => true,
        }
    }
}

/// Applies `filter` to `events` and orders the survivors.
pub fn apply_filter(events: Vec<NormalizedEvent>, filter: &EventFilter) -> Vec<NormalizedEvent> {
    let mut selected: Vec<NormalizedEvent> = events
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();
    selected.sort_by(|a, b| filter.sort.compare(a, b));
    selected
}

/// Reads every stored event and returns the filtered, sorted view.
pub async fn fetch_events(
    store: &dyn EventStore,
    filter: &EventFilter,
) -> Result<Vec<NormalizedEvent>, StoreError> {
    let events = store.get_all_events().await?;
    Ok(apply_filter(events, filter))
}
