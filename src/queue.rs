//! Delivery Queue
//!
//! Store-backed batching for tracked events. Pushed events are written to
//! the store and a background run drains them through the bound process
//! function in batches, under a batch delay and a concurrency limit.
//!
//! Until the first batch ever succeeds only one batch is in flight at a
//! time; afterwards up to `concurrency` batches are processed together.
//! Failed batches are not retried here: their events stay in the store and
//! become eligible again on the next round.

use crate::error::{TrackerError, TransportError};
use crate::event::Event;
use crate::observer::{default_observer, Diagnostic, SharedObserver};
use crate::store::{EventFilter, EventStore, MemoryStore};
use crate::transport::SharedTransport;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, warn};

pub type ProcessFuture = BoxFuture<'static, Result<(), TransportError>>;

/// Function each batch is handed to, usually a transport's `handle`
pub type ProcessFn = Arc<dyn Fn(Vec<Event>) -> ProcessFuture + Send + Sync>;

/// Configuration for the delivery queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Maximum number of events per batch
    pub batch_size: usize,
    /// Minimum delay between the end of one run and the start of the next
    pub batch_delay: Duration,
    /// Maximum concurrent batches once the first batch has succeeded
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(1000),
            concurrency: 4,
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.batch_size == 0 {
            return Err(TrackerError::ConfigError(
                "Queue batch_size must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(TrackerError::ConfigError(
                "Queue concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Events in the store, including in-flight ones
    pub pending: usize,
    /// Events currently being processed
    pub in_flight: usize,
    /// Batches delivered successfully
    pub delivered_batches: usize,
    /// Batches whose processing failed
    pub failed_batches: usize,
}

/// Delivery queue handle. Clones share the same queue.
#[derive(Clone)]
pub struct TrackerQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    store: Arc<dyn EventStore>,
    config: QueueConfig,
    processor: RwLock<Option<ProcessFn>>,
    observer: SharedObserver,
    /// Re-entrancy guard for `run`
    running: AtomicBool,
    first_batch_succeeded: AtomicBool,
    /// Ids read into a batch that has not settled yet
    in_flight: Mutex<HashSet<String>>,
    /// When the previous run finished
    last_run: Mutex<Option<Instant>>,
    delivered_batches: AtomicUsize,
    failed_batches: AtomicUsize,
}

impl TrackerQueue {
    /// Create a queue backed by an in-memory store
    pub fn new(config: QueueConfig) -> Result<Self, TrackerError> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn EventStore>, config: QueueConfig) -> Result<Self, TrackerError> {
        Self::with_observer(store, config, default_observer())
    }

    pub fn with_observer(
        store: Arc<dyn EventStore>,
        config: QueueConfig,
        observer: SharedObserver,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(QueueInner {
                store,
                config,
                processor: RwLock::new(None),
                observer,
                running: AtomicBool::new(false),
                first_batch_succeeded: AtomicBool::new(false),
                in_flight: Mutex::new(HashSet::new()),
                last_run: Mutex::new(None),
                delivered_batches: AtomicUsize::new(0),
                failed_batches: AtomicUsize::new(0),
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.inner.store
    }

    /// Set the function batches are handed to
    pub fn set_processor<F, Fut>(&self, processor: F)
    where
        F: Fn(Vec<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TransportError>> + Send + 'static,
    {
        let processor: ProcessFn = Arc::new(move |events| processor(events).boxed());
        *self.inner.processor.write() = Some(processor);
    }

    /// Hand every batch to `transport`
    pub fn bind_transport(&self, transport: SharedTransport) {
        debug!(transport = %transport.name(), "Binding queue to transport");
        self.set_processor(move |events: Vec<Event>| {
            let transport = Arc::clone(&transport);
            async move { transport.handle(&events).await }
        });
    }

    pub fn has_processor(&self) -> bool {
        self.inner.processor.read().is_some()
    }

    /// Write events to the store and schedule a run.
    ///
    /// Outside a tokio runtime nothing is scheduled; call [`TrackerQueue::run`] explicitly.
    pub fn push(&self, events: Vec<Event>) -> Result<(), TrackerError> {
        let count = events.len();
        self.inner.store.write(events)?;
        debug!(
            count,
            queue_size = self.inner.store.len(),
            "Enqueued events"
        );
        self.schedule_run();
        Ok(())
    }

    fn schedule_run(&self) {
        match Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    if let Err(e) = queue.run().await {
                        error!(error = %e, "Queue run failed");
                    }
                });
            }
            Err(_) => {
                debug!("No async runtime available, queue run deferred");
            }
        }
    }

    /// Drain the store through the process function.
    ///
    /// Returns `Ok(false)` without doing anything when another run is active
    /// or the queue is idle, and `Ok(true)` once this call drained the queue.
    pub async fn run(&self) -> Result<bool, TrackerError> {
        let processor = self
            .inner
            .processor
            .read()
            .clone()
            .ok_or(TrackerError::MissingProcessor)?;

        let mut ran = false;
        loop {
            if self.is_idle() {
                return Ok(ran);
            }
            if self
                .inner
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Ok(ran);
            }
            ran = true;

            while !self.is_idle() {
                self.run_round(&processor).await;
            }

            // Events pushed after the idle check above are picked up by the next iteration.
            self.inner.running.store(false, Ordering::SeqCst);
        }
    }

    async fn run_round(&self, processor: &ProcessFn) {
        self.wait_for_batch_delay().await;

        let concurrency = self.effective_concurrency();
        let mut batches = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            match self.read_batch() {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    warn!(error = %e, "Failed to read batch from store");
                    break;
                }
            }
        }

        debug!(
            batches = batches.len(),
            concurrency,
            "Dispatching batches"
        );
        join_all(
            batches
                .into_iter()
                .map(|batch| self.process_batch(processor, batch)),
        )
        .await;

        *self.inner.last_run.lock() = Some(Instant::now());
    }

    async fn wait_for_batch_delay(&self) {
        let last_run = *self.inner.last_run.lock();
        match last_run {
            Some(last_run) if Instant::now() < last_run + self.inner.config.batch_delay => {
                sleep_until(last_run + self.inner.config.batch_delay).await;
            }
            _ => tokio::task::yield_now().await,
        }
    }

    /// Read the next batch, skipping in-flight events, and mark it in flight
    fn read_batch(&self) -> Result<Vec<Event>, TrackerError> {
        let mut in_flight = self.inner.in_flight.lock();
        let batch = {
            let pending: &HashSet<String> = &in_flight;
            let not_in_flight = move |event: &Event| !pending.contains(event.id());
            self.inner
                .store
                .read(self.inner.config.batch_size, Some(&not_in_flight as EventFilter))?
        };
        for event in &batch {
            in_flight.insert(event.id().to_string());
        }
        Ok(batch)
    }

    async fn process_batch(&self, processor: &ProcessFn, batch: Vec<Event>) {
        let ids: Vec<String> = batch.iter().map(|e| e.id().to_string()).collect();
        let size = ids.len();
        let started = Instant::now();

        match processor(batch).await {
            Ok(()) => {
                if let Err(e) = self.inner.store.delete(&ids) {
                    warn!(error = %e, size, "Failed to delete delivered batch from store");
                }
                self.inner.first_batch_succeeded.store(true, Ordering::SeqCst);
                self.inner.delivered_batches.fetch_add(1, Ordering::Relaxed);
                self.inner.observer.observe(Diagnostic::BatchDelivered {
                    size,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                self.inner.failed_batches.fetch_add(1, Ordering::Relaxed);
                self.inner.observer.observe(Diagnostic::BatchFailed {
                    size,
                    error: e.to_string(),
                });
            }
        }

        let mut in_flight = self.inner.in_flight.lock();
        for id in &ids {
            in_flight.remove(id);
        }
    }

    /// `1` until the first batch has succeeded, then the configured concurrency
    pub fn effective_concurrency(&self) -> usize {
        if self.inner.first_batch_succeeded.load(Ordering::SeqCst) {
            self.inner.config.concurrency
        } else {
            1
        }
    }

    /// Drop everything pending, including events already handed to the processor
    pub fn flush(&self) -> Result<(), TrackerError> {
        let dropped = self.inner.store.len();
        self.inner.store.clear()?;
        debug!(dropped, "Flushed queue");
        Ok(())
    }

    /// Nothing stored and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.inner.store.is_empty() && self.inner.in_flight.lock().is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.inner.store.len(),
            in_flight: self.inner.in_flight.lock().len(),
            delivered_batches: self.inner.delivered_batches.load(Ordering::Relaxed),
            failed_batches: self.inner.failed_batches.load(Ordering::Relaxed),
        }
    }

    /// Poll [`TrackerQueue::is_idle`] every `interval` until idle (`true`) or `timeout` (`false`)
    pub async fn wait_until_idle(&self, interval: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}
