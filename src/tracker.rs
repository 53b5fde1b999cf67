//! Tracker
//!
//! Owns the configuration of one instrumentation client and runs the
//! per-event pipeline: construct → enrich → validate → queue or transport.
//!
//! Delivery runs in the background and its failures never reach the caller
//! of [`Tracker::track_event`]; they are reported to the observer. Plugin
//! failures do: they abort the pipeline for the event being tracked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::event::{Context, Contexts, Event, EventAttributes, IdGenerator, UuidGenerator};
use crate::observer::{default_observer, Diagnostic, SharedObserver};
use crate::plugin::{ApplicationContextPlugin, PluginChain, PluginHost, SharedPlugin};
use crate::queue::TrackerQueue;
use crate::transport::{SharedTransport, TransportGroup};

/// How `track_event` waits for the queue to drain
#[derive(Debug, Clone, PartialEq)]
pub struct WaitForQueueOptions {
    /// Poll interval
    pub interval: Duration,
    /// Give up after this long; defaults to twice the queue's batch delay
    pub timeout: Option<Duration>,
}

impl Default for WaitForQueueOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: None,
        }
    }
}

/// Whether `track_event` abandons pending events once it is done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushQueue {
    #[default]
    Never,
    Always,
    /// Flush only when the queue is not idle after the (optional) wait
    OnTimeout,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackEventOptions {
    pub wait_for_queue: Option<WaitForQueueOptions>,
    pub flush_queue: FlushQueue,
}

impl TrackEventOptions {
    pub fn wait_for_queue(mut self, options: WaitForQueueOptions) -> Self {
        self.wait_for_queue = Some(options);
        self
    }

    pub fn flush_queue(mut self, flush: FlushQueue) -> Self {
        self.flush_queue = flush;
        self
    }
}

pub struct TrackerBuilder {
    application_id: String,
    tracker_id: Option<String>,
    id_generator: Arc<dyn IdGenerator>,
    owner: Contexts,
    queue: Option<TrackerQueue>,
    transport: Option<SharedTransport>,
    recorder: Option<SharedTransport>,
    plugins: Option<Vec<SharedPlugin>>,
    observer: SharedObserver,
    active: bool,
    wait_defaults: WaitForQueueOptions,
}

impl TrackerBuilder {
    fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            tracker_id: None,
            id_generator: Arc::new(UuidGenerator),
            owner: Contexts::default(),
            queue: None,
            transport: None,
            recorder: None,
            plugins: None,
            observer: default_observer(),
            active: true,
            wait_defaults: WaitForQueueOptions::default(),
        }
    }

    /// Defaults to the application id
    pub fn tracker_id(mut self, tracker_id: impl Into<String>) -> Self {
        self.tracker_id = Some(tracker_id.into());
        self
    }

    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn location_stack(mut self, location_stack: Vec<Context>) -> Self {
        self.owner.location_stack = location_stack;
        self
    }

    pub fn global_contexts(mut self, global_contexts: Vec<Context>) -> Self {
        self.owner.global_contexts = global_contexts;
        self
    }

    pub fn queue(mut self, queue: TrackerQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// A transport that receives a copy of everything, grouped with the main transport
    pub fn recorder(mut self, recorder: SharedTransport) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Replaces the default plugins
    pub fn plugins(mut self, plugins: Vec<SharedPlugin>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn wait_defaults(mut self, wait_defaults: WaitForQueueOptions) -> Self {
        self.wait_defaults = wait_defaults;
        self
    }

    pub fn build(self) -> Result<Tracker, TrackerError> {
        if self.application_id.trim().is_empty() {
            return Err(TrackerError::ConfigError(
                "application_id cannot be empty".to_string(),
            ));
        }
        let tracker_id = self
            .tracker_id
            .unwrap_or_else(|| self.application_id.clone());

        let transport = match (self.transport, self.recorder) {
            (Some(transport), Some(recorder)) => {
                let group: SharedTransport = Arc::new(TransportGroup::with_observer(
                    TransportGroup::DEFAULT_NAME,
                    vec![transport, recorder],
                    Arc::clone(&self.observer),
                ));
                Some(group)
            }
            (None, Some(recorder)) => Some(recorder),
            (transport, None) => transport,
        };

        let plugins = self
            .plugins
            .unwrap_or_else(|| vec![Arc::new(ApplicationContextPlugin) as SharedPlugin]);
        let host = PluginHost::new(
            tracker_id.clone(),
            self.application_id.clone(),
            Arc::clone(&self.observer),
        );

        let tracker = Tracker {
            id: tracker_id,
            application_id: self.application_id,
            id_generator: self.id_generator,
            owner: self.owner,
            queue: self.queue,
            transport,
            plugins: RwLock::new(PluginChain::new(plugins, host)),
            observer: self.observer,
            active: AtomicBool::new(false),
            wait_defaults: self.wait_defaults,
        };

        if self.active {
            tracker.set_active(true);
        }
        Ok(tracker)
    }
}

pub struct Tracker {
    id: String,
    application_id: String,
    id_generator: Arc<dyn IdGenerator>,
    owner: Contexts,
    queue: Option<TrackerQueue>,
    transport: Option<SharedTransport>,
    plugins: RwLock<PluginChain>,
    observer: SharedObserver,
    active: AtomicBool,
    wait_defaults: WaitForQueueOptions,
}

impl Tracker {
    pub fn builder(application_id: impl Into<String>) -> TrackerBuilder {
        TrackerBuilder::new(application_id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn owner_contexts(&self) -> &Contexts {
        &self.owner
    }

    pub fn queue(&self) -> Option<&TrackerQueue> {
        self.queue.as_ref()
    }

    pub fn transport(&self) -> Option<&SharedTransport> {
        self.transport.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Switch between active and inactive. Activating initializes every
    /// plugin and binds the queue to a usable transport.
    pub fn set_active(&self, active: bool) {
        if self.active.swap(active, Ordering::SeqCst) == active {
            return;
        }
        if !active {
            info!(tracker_id = %self.id, "Tracker deactivated");
            return;
        }

        self.plugins.read().initialize_all();
        if let (Some(queue), Some(transport)) = (&self.queue, &self.transport) {
            if transport.is_usable() {
                queue.bind_transport(Arc::clone(transport));
            }
        }
        info!(tracker_id = %self.id, "Tracker activated");
    }

    /// Track an event and return it as constructed.
    ///
    /// Errors are plugin failures only; delivery outcome is reported to the observer.
    pub async fn track_event(
        &self,
        attributes: EventAttributes,
        options: TrackEventOptions,
    ) -> Result<Event, TrackerError> {
        let event = Event::track(attributes, &self.owner, self.id_generator.as_ref());

        if !self.is_active() {
            debug!(
                tracker_id = %self.id,
                event_id = %event.id(),
                "Tracker inactive, event not processed"
            );
            return Ok(event);
        }

        let event = {
            let plugins = self.plugins.read();
            let mut contexts = event.contexts();
            plugins.enrich(&mut contexts)?;
            let enriched = event.derive(contexts);
            plugins.validate(&enriched)?;
            enriched
        };

        if let Some(transport) = self.transport.as_ref().filter(|t| t.is_usable()) {
            match &self.queue {
                Some(queue) => {
                    if let Err(e) = queue.push(vec![event.clone()]) {
                        self.report_delivery_failure(transport.name(), &event, e.to_string());
                    }
                }
                None => self.spawn_delivery(Arc::clone(transport), event.clone()),
            }
        }

        if let Some(queue) = &self.queue {
            let reached_idle = match &options.wait_for_queue {
                Some(wait) => Some(self.wait_for_queue(wait).await),
                None => None,
            };
            let flush = match options.flush_queue {
                FlushQueue::Never => false,
                FlushQueue::Always => true,
                FlushQueue::OnTimeout => !reached_idle.unwrap_or_else(|| queue.is_idle()),
            };
            if flush {
                if let Err(e) = queue.flush() {
                    warn!(tracker_id = %self.id, error = %e, "Failed to flush queue");
                }
            }
        }

        Ok(event)
    }

    /// Wait until the queue is idle. `true` when idle (or no queue), `false` on timeout.
    pub async fn wait_for_queue(&self, options: &WaitForQueueOptions) -> bool {
        let Some(queue) = &self.queue else {
            return true;
        };
        let timeout = options
            .timeout
            .unwrap_or_else(|| queue.config().batch_delay * 2);
        queue.wait_until_idle(options.interval, timeout).await
    }

    /// Wait using the tracker's configured defaults
    pub async fn wait_for_queue_default(&self) -> bool {
        let options = self.wait_defaults.clone();
        self.wait_for_queue(&options).await
    }

    pub fn flush_queue(&self) -> Result<(), TrackerError> {
        match &self.queue {
            Some(queue) => queue.flush(),
            None => Ok(()),
        }
    }

    pub fn add_plugin(&self, plugin: SharedPlugin, index: Option<usize>) -> Result<(), TrackerError> {
        self.plugins.write().add(plugin, index)
    }

    pub fn remove_plugin(&self, name: &str) -> Result<SharedPlugin, TrackerError> {
        self.plugins.write().remove(name)
    }

    pub fn replace_plugin(
        &self,
        plugin: SharedPlugin,
        index: Option<usize>,
    ) -> Result<(), TrackerError> {
        self.plugins.write().replace(plugin, index)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().has(name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .read()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Hand one event to the transport on a background task.
    fn spawn_delivery(&self, transport: SharedTransport, event: Event) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.report_delivery_failure(
                    transport.name(),
                    &event,
                    "no async runtime available".to_string(),
                );
                return;
            }
        };
        let observer = Arc::clone(&self.observer);
        handle.spawn(async move {
            if let Err(e) = transport.handle(std::slice::from_ref(&event)).await {
                observe_delivery_failure(&observer, transport.name(), &event, e.to_string());
            }
        });
    }

    fn report_delivery_failure(&self, transport: &str, event: &Event, error: String) {
        observe_delivery_failure(&self.observer, transport, event, error);
    }
}

fn observe_delivery_failure(
    observer: &SharedObserver,
    transport: &str,
    event: &Event,
    error: String,
) {
    observer.observe(Diagnostic::DeliveryFailed {
        transport: transport.to_string(),
        event_id: event.id().to_string(),
        error,
    });
}
