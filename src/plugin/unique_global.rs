//! Reports global contexts that appear more than once on an event.

use std::collections::HashSet;

use super::{Plugin, PluginHost, Validate};
use crate::error::PluginError;
use crate::event::Event;

#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueGlobalContextPlugin;

impl UniqueGlobalContextPlugin {
    pub const NAME: &'static str = "UniqueGlobalContextPlugin";
}

impl Plugin for UniqueGlobalContextPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_validator(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

impl Validate for UniqueGlobalContextPlugin {
    fn validate(&self, event: &Event, host: &PluginHost) -> Result<(), PluginError> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for context in event.global_contexts() {
            let key = (context.context_type(), context.id());
            if !seen.insert(key) && reported.insert(key) {
                host.report_issue(
                    Self::NAME,
                    event,
                    format!(
                        "Duplicate global context {} with id '{}'",
                        context.context_type(),
                        context.id()
                    ),
                );
            }
        }
        Ok(())
    }
}
