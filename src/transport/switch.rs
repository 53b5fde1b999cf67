//! Fallback transport: pins the first usable transport at construction.
//!
//! Usability is evaluated once. A transport that becomes usable later is
//! never picked up, and a pinned transport that stops being usable keeps
//! receiving batches.

use async_trait::async_trait;

use super::{SharedTransport, Transport};
use crate::error::TransportError;
use crate::event::Event;
use crate::observer::{default_observer, Diagnostic, SharedObserver};

pub struct TransportSwitch {
    name: String,
    pinned: Option<SharedTransport>,
}

impl TransportSwitch {
    pub const DEFAULT_NAME: &'static str = "TransportSwitch";

    pub fn new(transports: Vec<SharedTransport>) -> Self {
        Self::with_observer(Self::DEFAULT_NAME, transports, default_observer())
    }

    pub fn with_observer(
        name: impl Into<String>,
        transports: Vec<SharedTransport>,
        observer: SharedObserver,
    ) -> Self {
        let name = name.into();
        let pinned = transports.iter().find(|t| t.is_usable()).cloned();

        match &pinned {
            Some(transport) => observer.observe(Diagnostic::TransportPinned {
                switch: name.clone(),
                transport: transport.name().to_string(),
            }),
            None => observer.observe(Diagnostic::NoUsableTransport {
                composite: name.clone(),
                candidates: transports.iter().map(|t| t.name().to_string()).collect(),
            }),
        }

        Self { name, pinned }
    }

    /// The transport selected at construction, if any
    pub fn pinned(&self) -> Option<&SharedTransport> {
        self.pinned.as_ref()
    }
}

#[async_trait]
impl Transport for TransportSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.pinned.is_some()
    }

    async fn handle(&self, events: &[Event]) -> Result<(), TransportError> {
        match &self.pinned {
            Some(transport) => transport.handle(events).await,
            None => Err(TransportError::NoUsableTransport(self.name.clone())),
        }
    }
}
