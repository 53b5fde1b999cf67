//! Error types for the event delivery pipeline.

use thiserror::Error;

/// Store-related errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store write rejected: {0}")]
    WriteRejected(String),
}

/// Errors raised by plugin hooks. They abort the pipeline for the event being tracked.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    #[error("Plugin '{plugin}' failed to enrich contexts: {message}")]
    Enrich { plugin: String, message: String },

    #[error("Plugin '{plugin}' failed to validate event: {message}")]
    Validate { plugin: String, message: String },
}

/// Delivery errors returned by transports.
///
/// Only [`TransportError::Retryable`] (and a [`TransportError::Group`] made up
/// exclusively of retryable failures) re-enters the retry backoff loop.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Retryable send failure in '{transport}': {message}")]
    Retryable { transport: String, message: String },

    #[error("Delivery rejected by '{transport}': {message}")]
    Rejected { transport: String, message: String },

    #[error("No usable transport in '{0}'")]
    NoUsableTransport(String),

    #[error("{} of the transports in group '{group}' failed", failures.len())]
    Group {
        group: String,
        failures: Vec<TransportError>,
    },

    #[error("Retry exhausted after {attempts} attempt(s) ({} error(s) recorded)", errors.len())]
    RetryExhausted {
        attempts: u32,
        /// Most recent error first.
        errors: Vec<TransportError>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TransportError {
    pub fn retryable(transport: impl Into<String>, message: impl Into<String>) -> Self {
        TransportError::Retryable {
            transport: transport.into(),
            message: message.into(),
        }
    }

    pub fn rejected(transport: impl Into<String>, message: impl Into<String>) -> Self {
        TransportError::Rejected {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Whether the retry transport may attempt delivery again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Retryable { .. } => true,
            TransportError::Group { failures, .. } => {
                !failures.is_empty() && failures.iter().all(TransportError::is_retryable)
            }
            TransportError::Rejected { .. } => false,
            TransportError::NoUsableTransport(_) => false,
            TransportError::RetryExhausted { .. } => false,
            TransportError::Store(_) => false,
        }
    }
}

/// Configuration and API errors for trackers, queues and registries.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Plugin already exists: {0}")]
    PluginAlreadyExists(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Invalid plugin index {index} (chain has {len} plugin(s))")]
    InvalidPluginIndex { index: usize, len: usize },

    #[error("Queue has no process function bound")]
    MissingProcessor,

    #[error("Invalid backoff configuration: {0}")]
    InvalidBackoff(String),

    #[error("No usable transport: {0}")]
    NoUsableTransport(String),

    #[error("Tracker not found: {0}")]
    TrackerNotFound(String),

    #[error("No default tracker registered")]
    NoDefaultTracker,

    #[error("Cannot delete default tracker '{0}' while other trackers are registered")]
    DefaultTrackerInUse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<config::ConfigError> for TrackerError {
    fn from(err: config::ConfigError) -> Self {
        TrackerError::ConfigError(err.to_string())
    }
}
