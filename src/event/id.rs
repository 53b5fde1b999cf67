//! Unique id generation for tracked events.
//!
//! The generator is picked once when a tracker is built. [`UuidGenerator`]
//! (random v4 UUIDs) is the default; [`SequentialIdGenerator`] is the
//! fallback for hosts without a usable random source, and is handy in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::now_millis;

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Ids of the form `evt-<millis>-<pid>-<seq>`.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let ts = now_millis();
        let pid = std::process::id();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("evt-{ts}-{pid}-{seq}")
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}
