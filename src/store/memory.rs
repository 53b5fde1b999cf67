//! In-memory event store.

use std::collections::{HashSet, VecDeque};

use parking_lot::RwLock;

use super::{EventFilter, EventStore};
use crate::error::StoreError;
use crate::event::Event;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoredEvents>,
}

/// FIFO backlog plus the set of ids it holds
#[derive(Debug, Default)]
struct StoredEvents {
    events: VecDeque<Event>,
    ids: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryStore {
    fn read(&self, max: usize, filter: Option<EventFilter<'_>>) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .events
            .iter()
            .filter(|event| filter.map_or(true, |f| f(*event)))
            .take(max)
            .cloned()
            .collect())
    }

    fn write(&self, incoming: Vec<Event>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let StoredEvents { events, ids } = &mut *inner;
        for event in incoming {
            if ids.insert(event.id().to_string()) {
                events.push_back(event);
            } else if let Some(stored) =
                events.iter_mut().find(|stored| stored.id() == event.id())
            {
                *stored = event;
            }
        }
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut inner = self.inner.write();
        let StoredEvents { events, ids: index } = &mut *inner;
        events.retain(|event| !doomed.contains(event.id()));
        index.retain(|id| !doomed.contains(id.as_str()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.events.clear();
        inner.ids.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.read().events.len()
    }
}
