//! Persistence of normalized events.
//!
//! The harvest pipeline only needs [`EventStore::save_events`]; the listing
//! side reads back through the remaining methods.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;

use crate::model::NormalizedEvent;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Store lock poisoned")]
    Poisoned,
    #[error("Storage task failed: {0}")]
    Join(String),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists `events`, skipping any that already exist.
    ///
    /// An event already exists when a stored event has the same URL, calendar
    /// day and title. Returns the number of newly inserted events.
    async fn save_events(&self, events: &[NormalizedEvent]) -> Result<usize, StoreError>;

    /// All stored events with their tags, in insertion order.
    async fn get_all_events(&self) -> Result<Vec<NormalizedEvent>, StoreError>;

    async fn get_event_by_id(&self, id: i64) -> Result<Option<NormalizedEvent>, StoreError>;

    /// Distinct tag names, sorted.
    async fn get_all_tags(&self) -> Result<Vec<String>, StoreError>;

    /// Removes every event, tag and association.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Whether two events are the same stored event for deduplication purposes.
pub(crate) fn is_same_event(stored: &NormalizedEvent, candidate: &NormalizedEvent) -> bool {
    stored.url == candidate.url && stored.day() == candidate.day() && stored.title == candidate.title
}
