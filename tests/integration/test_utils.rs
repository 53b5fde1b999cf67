//! Shared test utilities for integration tests
//!
//! Scriptable transports, a collecting observer and event builders.

use async_trait::async_trait;
use eventline::event::{Event, EventAttributes};
use eventline::observer::{Diagnostic, TrackerObserver};
use eventline::{Transport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transport that records every batch it is handed.
///
/// Outcomes are scripted per call; once the script runs out every call succeeds.
pub struct RecordingTransport {
    name: String,
    usable: AtomicBool,
    delay: Option<Duration>,
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    batches: Mutex<Vec<Vec<Event>>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(name: &str) -> Arc<Self> {
        Self::build(name, true, None, Vec::new())
    }

    pub fn unusable(name: &str) -> Arc<Self> {
        Self::build(name, false, None, Vec::new())
    }

    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Self::build(name, true, Some(delay), Vec::new())
    }

    pub fn scripted(name: &str, script: Vec<Result<(), TransportError>>) -> Arc<Self> {
        Self::build(name, true, None, script)
    }

    pub fn slow_scripted(
        name: &str,
        delay: Duration,
        script: Vec<Result<(), TransportError>>,
    ) -> Arc<Self> {
        Self::build(name, true, Some(delay), script)
    }

    fn build(
        name: &str,
        usable: bool,
        delay: Option<Duration>,
        script: Vec<Result<(), TransportError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            usable: AtomicBool::new(usable),
            delay,
            script: Mutex::new(script.into()),
            batches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    pub fn set_usable(&self, usable: bool) {
        self.usable.store(usable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<Event>> {
        self.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .map(|e| e.id().to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.usable.load(Ordering::SeqCst)
    }

    async fn handle(&self, events: &[Event]) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.batches.lock().push(events.to_vec());
        let outcome = self.script.lock().pop_front().unwrap_or(Ok(()));

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Observer that keeps every diagnostic
#[derive(Default)]
pub struct CollectingObserver {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.lock().clone()
    }
}

impl TrackerObserver for CollectingObserver {
    fn observe(&self, diagnostic: Diagnostic) {
        self.seen.lock().push(diagnostic);
    }
}

/// `count` events with ids `e-0`, `e-1`, ...
pub fn events(count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| Event::new(EventAttributes::new("PressEvent"), format!("e-{i}"), i as u64))
        .collect()
}

pub fn retryable(name: &str) -> TransportError {
    TransportError::retryable(name, "service unavailable")
}

pub fn rejected(name: &str) -> TransportError {
    TransportError::rejected(name, "bad request")
}
