//! Tracker registry: named tracker instances plus a default pointer.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::TrackerError;
use crate::tracker::{Tracker, WaitForQueueOptions};

#[derive(Default)]
struct RegistryState {
    trackers: BTreeMap<String, Arc<Tracker>>,
    default_id: Option<String>,
}

/// Registry of tracker instances
///
/// The first tracker added becomes the default. Lookups without an id
/// resolve to the default.
#[derive(Default)]
pub struct TrackerRegistry {
    state: RwLock<RegistryState>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracker. A tracker whose id is already registered is
    /// ignored and the existing instance is returned.
    pub fn add(&self, tracker: impl Into<Arc<Tracker>>) -> Arc<Tracker> {
        let tracker = tracker.into();
        let mut state = self.state.write();

        if let Some(existing) = state.trackers.get(tracker.id()) {
            warn!(tracker_id = %tracker.id(), "Tracker already registered, keeping existing instance");
            return Arc::clone(existing);
        }

        let id = tracker.id().to_string();
        if state.default_id.is_none() {
            state.default_id = Some(id.clone());
        }
        debug!(tracker_id = %id, "Tracker registered");
        state.trackers.insert(id, Arc::clone(&tracker));
        tracker
    }

    /// Remove a tracker. The default can only go once it is the last one left.
    pub fn delete(&self, id: &str) -> Result<Arc<Tracker>, TrackerError> {
        let mut state = self.state.write();
        if !state.trackers.contains_key(id) {
            return Err(TrackerError::TrackerNotFound(id.to_string()));
        }

        let is_default = state.default_id.as_deref() == Some(id);
        if is_default && state.trackers.len() > 1 {
            return Err(TrackerError::DefaultTrackerInUse(id.to_string()));
        }

        let removed = state
            .trackers
            .remove(id)
            .ok_or_else(|| TrackerError::TrackerNotFound(id.to_string()))?;
        if is_default {
            state.default_id = None;
        }
        debug!(tracker_id = %id, "Tracker removed");
        Ok(removed)
    }

    /// Look up a tracker, or the default when `id` is `None`.
    pub fn get(&self, id: Option<&str>) -> Result<Arc<Tracker>, TrackerError> {
        let state = self.state.read();
        let id = match id {
            Some(id) => id,
            None => state
                .default_id
                .as_deref()
                .ok_or(TrackerError::NoDefaultTracker)?,
        };
        state
            .trackers
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::TrackerNotFound(id.to_string()))
    }

    pub fn set_default(&self, id: &str) -> Result<(), TrackerError> {
        let mut state = self.state.write();
        if !state.trackers.contains_key(id) {
            return Err(TrackerError::TrackerNotFound(id.to_string()));
        }
        state.default_id = Some(id.to_string());
        Ok(())
    }

    pub fn default_id(&self) -> Option<String> {
        self.state.read().default_id.clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state.read().trackers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().trackers.is_empty()
    }

    pub fn activate_all(&self) {
        for tracker in self.snapshot() {
            tracker.set_active(true);
        }
    }

    pub fn deactivate_all(&self) {
        for tracker in self.snapshot() {
            tracker.set_active(false);
        }
    }

    /// Flush every queue. All queues are attempted; the first failure is returned.
    pub fn flush_all_queues(&self) -> Result<(), TrackerError> {
        let mut first_error = None;
        for tracker in self.snapshot() {
            if let Err(e) = tracker.flush_queue() {
                warn!(tracker_id = %tracker.id(), error = %e, "Failed to flush queue");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// `true` iff every tracker's queue reached idle.
    pub async fn wait_for_all_queues(&self, options: &WaitForQueueOptions) -> bool {
        let trackers = self.snapshot();
        join_all(trackers.iter().map(|t| t.wait_for_queue(options)))
            .await
            .into_iter()
            .all(|idle| idle)
    }

    fn snapshot(&self) -> Vec<Arc<Tracker>> {
        self.state.read().trackers.values().cloned().collect()
    }
}
