//! Eventline: Event Instrumentation Client
//!
//! Trackers build events from owner and caller contexts, run them through a
//! plugin chain, and hand them to a batching delivery queue backed by
//! composable transports (switch, group, retry).

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod observer;
pub mod plugin;
pub mod queue;
pub mod registry;
pub mod store;
pub mod tracker;
pub mod transport;

pub use error::{PluginError, StoreError, TrackerError, TransportError};
pub use event::{Context, ContextKind, Contexts, Event, EventAttributes};
pub use queue::{QueueConfig, TrackerQueue};
pub use registry::TrackerRegistry;
pub use tracker::{FlushQueue, TrackEventOptions, Tracker, TrackerBuilder, WaitForQueueOptions};
pub use transport::{RetryPolicy, SharedTransport, Transport};
