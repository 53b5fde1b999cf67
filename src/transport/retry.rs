//! Retry transport with exponential backoff.
//!
//! Every `handle` call runs its own [`RetryAttempt`]. Only retryable send
//! failures are retried; any other error ends the attempt immediately.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::{SharedTransport, Transport};
use crate::error::{TrackerError, TransportError};
use crate::event::Event;
use crate::observer::{default_observer, Diagnostic, SharedObserver};

/// Backoff and give-up bounds for [`RetryTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of calls to the inner transport per `handle`
    pub max_attempts: u32,
    /// Give up once this much time has passed since the attempt started (`None` = never)
    pub max_retry: Option<Duration>,
    /// Wait before the first retry
    pub min_timeout: Duration,
    /// Upper bound for any single wait (`None` = unbounded)
    pub max_timeout: Option<Duration>,
    /// Growth factor applied per retry
    pub retry_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            max_retry: None,
            min_timeout: Duration::from_millis(1000),
            max_timeout: None,
            retry_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.retry_factor.is_finite() || self.retry_factor <= 0.0 {
            return Err(TrackerError::InvalidBackoff(format!(
                "retry_factor must be a positive number, got {}",
                self.retry_factor
            )));
        }
        if self.min_timeout.is_zero() {
            return Err(TrackerError::InvalidBackoff(
                "min_timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(max_timeout) = self.max_timeout {
            if self.min_timeout > max_timeout {
                return Err(TrackerError::InvalidBackoff(format!(
                    "min_timeout ({}ms) cannot be greater than max_timeout ({}ms)",
                    self.min_timeout.as_millis(),
                    max_timeout.as_millis()
                )));
            }
        }
        Ok(())
    }

    /// `min(round(min_timeout * retry_factor^n), max_timeout)`
    pub fn next_timeout(&self, n: u32) -> Duration {
        let exponent = i32::try_from(n).unwrap_or(i32::MAX);
        let raw = (self.min_timeout.as_millis() as f64 * self.retry_factor.powi(exponent)).round();
        let millis = if raw.is_finite() { raw as u64 } else { u64::MAX };
        let timeout = Duration::from_millis(millis);
        match self.max_timeout {
            Some(max_timeout) => timeout.min(max_timeout),
            None => timeout,
        }
    }
}

pub struct RetryTransport {
    name: String,
    transport: SharedTransport,
    policy: RetryPolicy,
    observer: SharedObserver,
}

impl RetryTransport {
    pub fn new(transport: SharedTransport, policy: RetryPolicy) -> Result<Self, TrackerError> {
        Self::with_observer(transport, policy, default_observer())
    }

    pub fn with_observer(
        transport: SharedTransport,
        policy: RetryPolicy,
        observer: SharedObserver,
    ) -> Result<Self, TrackerError> {
        policy.validate()?;
        Ok(Self {
            name: format!("RetryTransport({})", transport.name()),
            transport,
            policy,
            observer,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &SharedTransport {
        &self.transport
    }
}

#[async_trait]
impl Transport for RetryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.transport.is_usable()
    }

    async fn handle(&self, events: &[Event]) -> Result<(), TransportError> {
        RetryAttempt::new(self).run(events).await
    }
}

/// State of one `handle` call on a [`RetryTransport`]
pub struct RetryAttempt<'a> {
    retry: &'a RetryTransport,
    errors: Vec<TransportError>,
    attempt_count: u32,
    started_at: Instant,
}

impl<'a> RetryAttempt<'a> {
    fn new(retry: &'a RetryTransport) -> Self {
        Self {
            retry,
            errors: Vec::new(),
            attempt_count: 1,
            started_at: Instant::now(),
        }
    }

    /// Errors seen so far, most recent first
    pub fn errors(&self) -> &[TransportError] {
        &self.errors
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    fn is_exhausted(&self) -> bool {
        let policy = &self.retry.policy;
        if self.attempt_count > policy.max_attempts {
            return true;
        }
        matches!(policy.max_retry, Some(max_retry) if self.started_at.elapsed() >= max_retry)
    }

    async fn run(mut self, events: &[Event]) -> Result<(), TransportError> {
        loop {
            if self.is_exhausted() {
                let attempts = self.attempt_count - 1;
                self.retry.observer.observe(Diagnostic::RetryExhausted {
                    transport: self.retry.name.clone(),
                    attempts,
                });
                return Err(TransportError::RetryExhausted {
                    attempts,
                    errors: self.errors,
                });
            }

            match self.retry.transport.handle(events).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() => {
                    let delay = self.retry.policy.next_timeout(self.attempt_count - 1);
                    self.retry.observer.observe(Diagnostic::RetryScheduled {
                        transport: self.retry.name.clone(),
                        attempt: self.attempt_count,
                        delay_ms: delay.as_millis() as u64,
                        error: err.to_string(),
                    });
                    self.errors.insert(0, err);
                    sleep(delay).await;
                    self.attempt_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
