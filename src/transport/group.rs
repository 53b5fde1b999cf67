//! Fan-out transport: hands every batch to all transports usable at construction.
//!
//! `handle` awaits every member before settling. It succeeds only when every
//! member succeeded; otherwise it fails with [`TransportError::Group`]
//! listing each member failure in member order.

use async_trait::async_trait;
use futures::future::join_all;

use super::{SharedTransport, Transport};
use crate::error::TransportError;
use crate::event::Event;
use crate::observer::{default_observer, Diagnostic, SharedObserver};

pub struct TransportGroup {
    name: String,
    members: Vec<SharedTransport>,
}

impl TransportGroup {
    pub const DEFAULT_NAME: &'static str = "TransportGroup";

    pub fn new(transports: Vec<SharedTransport>) -> Self {
        Self::with_observer(Self::DEFAULT_NAME, transports, default_observer())
    }

    pub fn with_observer(
        name: impl Into<String>,
        transports: Vec<SharedTransport>,
        observer: SharedObserver,
    ) -> Self {
        let name = name.into();
        let candidates: Vec<String> = transports.iter().map(|t| t.name().to_string()).collect();
        let members: Vec<SharedTransport> = transports.into_iter().filter(|t| t.is_usable()).collect();

        if members.is_empty() {
            observer.observe(Diagnostic::NoUsableTransport {
                composite: name.clone(),
                candidates,
            });
        }

        Self { name, members }
    }

    pub fn members(&self) -> &[SharedTransport] {
        &self.members
    }
}

#[async_trait]
impl Transport for TransportGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        !self.members.is_empty()
    }

    async fn handle(&self, events: &[Event]) -> Result<(), TransportError> {
        if self.members.is_empty() {
            return Err(TransportError::NoUsableTransport(self.name.clone()));
        }

        let results = join_all(self.members.iter().map(|member| member.handle(events))).await;
        let failures: Vec<TransportError> = results.into_iter().filter_map(Result::err).collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransportError::Group {
                group: self.name.clone(),
                failures,
            })
        }
    }
}
