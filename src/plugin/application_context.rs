//! Adds the owning application's global context to every event.

use super::{Enrich, Plugin, PluginHost, Validate};
use crate::error::PluginError;
use crate::event::{Context, Contexts, Event};

pub const APPLICATION_CONTEXT: &str = "ApplicationContext";

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationContextPlugin;

impl ApplicationContextPlugin {
    pub const NAME: &'static str = "ApplicationContextPlugin";
}

impl Plugin for ApplicationContextPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_enricher(&self) -> Option<&dyn Enrich> {
        Some(self)
    }

    fn as_validator(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

impl Enrich for ApplicationContextPlugin {
    fn enrich(&self, contexts: &mut Contexts, host: &PluginHost) -> Result<(), PluginError> {
        if !contexts.has_global(APPLICATION_CONTEXT) {
            contexts
                .global_contexts
                .push(Context::global(APPLICATION_CONTEXT, host.application_id()));
        }
        Ok(())
    }
}

impl Validate for ApplicationContextPlugin {
    fn validate(&self, event: &Event, host: &PluginHost) -> Result<(), PluginError> {
        let count = event
            .global_contexts()
            .iter()
            .filter(|c| c.context_type() == APPLICATION_CONTEXT)
            .count();
        match count {
            1 => {}
            0 => host.report_issue(Self::NAME, event, "ApplicationContext is missing"),
            n => host.report_issue(
                Self::NAME,
                event,
                format!("ApplicationContext must be present once, found {n}"),
            ),
        }
        Ok(())
    }
}
