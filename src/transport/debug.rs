//! Development transport that logs every event and always succeeds.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::Transport;
use crate::error::TransportError;
use crate::event::Event;

#[derive(Debug, Clone)]
pub struct DebugTransport {
    name: String,
}

impl DebugTransport {
    pub fn new() -> Self {
        Self::named("DebugTransport")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for DebugTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for DebugTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        true
    }

    async fn handle(&self, events: &[Event]) -> Result<(), TransportError> {
        for event in events {
            let time = DateTime::<Utc>::from_timestamp_millis(event.time() as i64)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default();
            let payload = serde_json::to_string(event)
                .map_err(|e| TransportError::rejected(self.name.clone(), e.to_string()))?;
            debug!(
                transport = %self.name,
                event_type = %event.event_type(),
                event_id = %event.id(),
                time = %time,
                payload = %payload,
                "Event delivered"
            );
        }
        Ok(())
    }
}
