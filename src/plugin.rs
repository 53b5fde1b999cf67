//! Plugin Chain
//!
//! Plugins enrich and validate events before they are queued. A plugin
//! declares which hooks it implements through the `as_*` capability
//! accessors; the chain skips absent hooks without probing.
//!
//! Hooks run strictly in registration order, and only when the plugin is
//! usable at call time. Later plugins see the mutations of earlier ones.

use std::sync::Arc;

use tracing::debug;

use crate::error::{PluginError, TrackerError};
use crate::event::{Contexts, Event};
use crate::observer::{Diagnostic, SharedObserver};

pub mod application_context;
pub mod unique_global;

pub use application_context::ApplicationContextPlugin;
pub use unique_global::UniqueGlobalContextPlugin;

/// What plugins get to see of the tracker that owns them.
#[derive(Clone)]
pub struct PluginHost {
    tracker_id: String,
    application_id: String,
    observer: SharedObserver,
}

impl PluginHost {
    pub fn new(
        tracker_id: impl Into<String>,
        application_id: impl Into<String>,
        observer: SharedObserver,
    ) -> Self {
        Self {
            tracker_id: tracker_id.into(),
            application_id: application_id.into(),
            observer,
        }
    }

    pub fn tracker_id(&self) -> &str {
        &self.tracker_id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// Report a non-fatal validation finding.
    pub fn report_issue(&self, plugin: &str, event: &Event, message: impl Into<String>) {
        self.observer.observe(Diagnostic::ValidationIssue {
            plugin: plugin.to_string(),
            event_id: event.id().to_string(),
            message: message.into(),
        });
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Re-checked before every hook invocation
    fn is_usable(&self) -> bool {
        true
    }

    fn as_initializer(&self) -> Option<&dyn Initialize> {
        None
    }

    fn as_enricher(&self) -> Option<&dyn Enrich> {
        None
    }

    fn as_validator(&self) -> Option<&dyn Validate> {
        None
    }
}

pub trait Initialize {
    fn initialize(&self, host: &PluginHost);
}

pub trait Enrich {
    fn enrich(&self, contexts: &mut Contexts, host: &PluginHost) -> Result<(), PluginError>;
}

/// Validation reports findings through [`PluginHost::report_issue`].
/// Returning an error is reserved for plugin failures.
pub trait Validate {
    fn validate(&self, event: &Event, host: &PluginHost) -> Result<(), PluginError>;
}

pub type SharedPlugin = Arc<dyn Plugin>;

pub struct PluginChain {
    plugins: Vec<SharedPlugin>,
    host: PluginHost,
}

impl PluginChain {
    /// Build a chain. When two plugins share a name, only the later one is kept.
    pub fn new(plugins: Vec<SharedPlugin>, host: PluginHost) -> Self {
        let mut unique: Vec<SharedPlugin> = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            unique.retain(|existing| existing.name() != plugin.name());
            unique.push(plugin);
        }
        Self {
            plugins: unique,
            host,
        }
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<SharedPlugin, TrackerError> {
        self.position(name)
            .map(|i| Arc::clone(&self.plugins[i]))
            .ok_or_else(|| TrackerError::PluginNotFound(name.to_string()))
    }

    /// Insert a plugin (at the end unless `index` is given) and initialize it.
    pub fn add(&mut self, plugin: SharedPlugin, index: Option<usize>) -> Result<(), TrackerError> {
        if self.has(plugin.name()) {
            return Err(TrackerError::PluginAlreadyExists(plugin.name().to_string()));
        }
        let len = self.plugins.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(TrackerError::InvalidPluginIndex { index, len });
        }

        debug!(plugin = %plugin.name(), index, "Adding plugin");
        self.plugins.insert(index, Arc::clone(&plugin));
        Self::initialize_one(plugin.as_ref(), &self.host);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<SharedPlugin, TrackerError> {
        let index = self
            .position(name)
            .ok_or_else(|| TrackerError::PluginNotFound(name.to_string()))?;
        debug!(plugin = %name, "Removing plugin");
        Ok(self.plugins.remove(index))
    }

    /// Remove the plugin with the same name and add `plugin`, at its old position by default.
    pub fn replace(&mut self, plugin: SharedPlugin, index: Option<usize>) -> Result<(), TrackerError> {
        let original = self
            .position(plugin.name())
            .ok_or_else(|| TrackerError::PluginNotFound(plugin.name().to_string()))?;
        self.remove(plugin.name())?;
        self.add(plugin, Some(index.unwrap_or(original)))
    }

    pub fn initialize_all(&self) {
        for plugin in &self.plugins {
            Self::initialize_one(plugin.as_ref(), &self.host);
        }
    }

    pub fn enrich(&self, contexts: &mut Contexts) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            if let Some(enricher) = plugin.as_enricher() {
                if plugin.is_usable() {
                    enricher.enrich(contexts, &self.host)?;
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self, event: &Event) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            if let Some(validator) = plugin.as_validator() {
                if plugin.is_usable() {
                    validator.validate(event, &self.host)?;
                }
            }
        }
        Ok(())
    }

    fn initialize_one(plugin: &dyn Plugin, host: &PluginHost) {
        if let Some(initializer) = plugin.as_initializer() {
            if plugin.is_usable() {
                initializer.initialize(host);
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }
}
