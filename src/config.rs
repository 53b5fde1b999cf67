//! Configuration System
//!
//! Layered configuration for trackers: built-in defaults, the user-level
//! config file, the workspace `eventline.toml`, then `EVENTLINE__*`
//! environment variables. Settings convert into the runtime types
//! ([`QueueConfig`], [`RetryPolicy`], [`WaitForQueueOptions`]).

use crate::logging::LoggingConfig;
use crate::queue::QueueConfig;
use crate::tracker::WaitForQueueOptions;
use crate::transport::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventlineConfig {
    #[serde(default)]
    pub tracker: TrackerSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub wait: WaitSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    #[serde(default = "default_application_id")]
    pub application_id: String,

    /// Defaults to the application id
    #[serde(default)]
    pub tracker_id: Option<String>,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_application_id() -> String {
    "eventline".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            application_id: default_application_id(),
            tracker_id: None,
            active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            concurrency: default_concurrency(),
        }
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        QueueConfig {
            batch_size: settings.batch_size,
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            concurrency: settings.concurrency,
        }
    }
}

/// Backoff settings; unset limits are unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub max_retry_ms: Option<u64>,

    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,

    #[serde(default)]
    pub max_timeout_ms: Option<u64>,

    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_min_timeout_ms() -> u64 {
    1000
}

fn default_retry_factor() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_retry_ms: None,
            min_timeout_ms: default_min_timeout_ms(),
            max_timeout_ms: None,
            retry_factor: default_retry_factor(),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts,
            max_retry: settings.max_retry_ms.map(Duration::from_millis),
            min_timeout: Duration::from_millis(settings.min_timeout_ms),
            max_timeout: settings.max_timeout_ms.map(Duration::from_millis),
            retry_factor: settings.retry_factor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Defaults to twice the queue's batch delay
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    100
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl From<&WaitSettings> for WaitForQueueOptions {
    fn from(settings: &WaitSettings) -> Self {
        WaitForQueueOptions {
            interval: Duration::from_millis(settings.interval_ms),
            timeout: settings.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Tracker(String),
    Queue(String),
    Retry(String),
    Wait(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Tracker(msg) => write!(f, "Tracker: {}", msg),
            ValidationError::Queue(msg) => write!(f, "Queue: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Wait(msg) => write!(f, "Wait: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EventlineConfig {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::from(&self.queue)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn wait_options(&self) -> WaitForQueueOptions {
        WaitForQueueOptions::from(&self.wait)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.tracker.application_id.trim().is_empty() {
            errors.push(ValidationError::Tracker(
                "application_id cannot be empty".to_string(),
            ));
        }
        if matches!(&self.tracker.tracker_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError::Tracker(
                "tracker_id cannot be empty when set".to_string(),
            ));
        }

        if let Err(e) = self.queue_config().validate() {
            errors.push(ValidationError::Queue(e.to_string()));
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.retry.retry_factor.is_finite() && self.retry.retry_factor > 0.0) {
            errors.push(ValidationError::Retry(format!(
                "retry_factor must be a positive number, got {}",
                self.retry.retry_factor
            )));
        }
        if let Err(e) = self.retry_policy().validate() {
            errors.push(ValidationError::Retry(e.to_string()));
        }

        if self.wait.interval_ms == 0 {
            errors.push(ValidationError::Wait(
                "interval_ms must be greater than 0".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
