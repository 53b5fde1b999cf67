//! Diagnostics observer.
//!
//! Transports, the queue and plugins report what happened through a
//! [`TrackerObserver`] instead of logging inline. The default observer
//! forwards every diagnostic to `tracing`.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    TransportPinned {
        switch: String,
        transport: String,
    },
    NoUsableTransport {
        composite: String,
        candidates: Vec<String>,
    },
    RetryScheduled {
        transport: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    RetryExhausted {
        transport: String,
        attempts: u32,
    },
    BatchDelivered {
        size: usize,
        duration_ms: u64,
    },
    BatchFailed {
        size: usize,
        error: String,
    },
    DeliveryFailed {
        transport: String,
        event_id: String,
        error: String,
    },
    ValidationIssue {
        plugin: String,
        event_id: String,
        message: String,
    },
}

pub trait TrackerObserver: Send + Sync {
    fn observe(&self, diagnostic: Diagnostic);
}

pub type SharedObserver = Arc<dyn TrackerObserver>;

/// Logs every diagnostic with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TrackerObserver for TracingObserver {
    fn observe(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::TransportPinned { switch, transport } => {
                debug!(switch = %switch, transport = %transport, "Transport switch pinned transport");
            }
            Diagnostic::NoUsableTransport {
                composite,
                candidates,
            } => {
                warn!(
                    composite = %composite,
                    candidates = ?candidates,
                    "No usable transport found"
                );
            }
            Diagnostic::RetryScheduled {
                transport,
                attempt,
                delay_ms,
                error,
            } => {
                debug!(
                    transport = %transport,
                    attempt,
                    delay_ms,
                    error = %error,
                    "Retrying delivery after backoff"
                );
            }
            Diagnostic::RetryExhausted {
                transport,
                attempts,
            } => {
                warn!(transport = %transport, attempts, "Delivery retries exhausted");
            }
            Diagnostic::BatchDelivered { size, duration_ms } => {
                debug!(size, duration_ms, "Batch delivered");
            }
            Diagnostic::BatchFailed { size, error } => {
                warn!(size, error = %error, "Batch delivery failed, events stay queued");
            }
            Diagnostic::DeliveryFailed {
                transport,
                event_id,
                error,
            } => {
                warn!(
                    transport = %transport,
                    event_id = %event_id,
                    error = %error,
                    "Event delivery failed"
                );
            }
            Diagnostic::ValidationIssue {
                plugin,
                event_id,
                message,
            } => {
                info!(
                    plugin = %plugin,
                    event_id = %event_id,
                    message = %message,
                    "Event validation issue"
                );
            }
        }
    }
}

/// Drops every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TrackerObserver for NullObserver {
    fn observe(&self, _diagnostic: Diagnostic) {}
}

pub fn default_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}
