//! Transport Abstraction
//!
//! A transport delivers a batch of events to a collector. Composite
//! transports implement the same contract, so they nest freely:
//!
//! - [`TransportSwitch`] pins the first usable transport (fallback)
//! - [`TransportGroup`] fans out to every usable transport
//! - [`RetryTransport`] retries retryable failures with exponential backoff
//!
//! Concrete network transports live outside this crate.

use crate::error::TransportError;
use crate::event::Event;
use async_trait::async_trait;
use std::sync::Arc;

pub mod debug;
pub mod group;
pub mod retry;
pub mod switch;

pub use debug::DebugTransport;
pub use group::TransportGroup;
pub use retry::{RetryAttempt, RetryPolicy, RetryTransport};
pub use switch::TransportSwitch;

/// Event delivery capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Whether the transport can be used in the current environment
    fn is_usable(&self) -> bool;

    /// Deliver a batch of events, preserving their order
    async fn handle(&self, events: &[Event]) -> Result<(), TransportError>;
}

pub type SharedTransport = Arc<dyn Transport>;
