use super::{is_same_event, EventStore, StoreError};
use crate::model::NormalizedEvent;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    events: Vec<NormalizedEvent>,
    tags: BTreeSet<String>,
    next_id: i64,
}

/// In-process store with the same duplicate semantics as the SQLite store.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn save_events(&self, events: &[NormalizedEvent]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut saved = 0;

        for event in events {
            if inner.events.iter().any(|stored| is_same_event(stored, event)) {
                continue;
            }
            inner.next_id += 1;
            let mut stored = event.clone();
            stored.id = inner.next_id;
            inner.tags.extend(stored.tags.iter().cloned());
            inner.events.push(stored);
            saved += 1;
        }
        Ok(saved)
    }

    async fn get_all_events(&self) -> Result<Vec<NormalizedEvent>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.events.clone())
    }

    async fn get_event_by_id(&self, id: i64) -> Result<Option<NormalizedEvent>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.events.iter().find(|event| event.id == id).cloned())
    }

    async fn get_all_tags(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.tags.iter().cloned().collect())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        *inner = Inner::default();
        Ok(())
    }
}
