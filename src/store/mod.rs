//! Event Store
//!
//! Ordered persistence for events waiting to be delivered. The queue reads
//! batches from the store, and deletes events only after a batch has been
//! handled successfully.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::event::Event;

/// Predicate used to skip events while reading a batch.
pub type EventFilter<'a> = &'a (dyn Fn(&Event) -> bool + Send + Sync);

/// Event store interface
///
/// Implementations must be internally synchronised: the queue reads, writes
/// and deletes from concurrent batch completions.
pub trait EventStore: Send + Sync {
    /// Read up to `max` events in insertion order, skipping events rejected by `filter`.
    fn read(&self, max: usize, filter: Option<EventFilter<'_>>) -> Result<Vec<Event>, StoreError>;

    /// Append events. An event whose id is already stored replaces the stored copy in place.
    fn write(&self, events: Vec<Event>) -> Result<(), StoreError>;

    fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
