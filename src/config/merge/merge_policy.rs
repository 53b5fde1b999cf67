//! Merge rules: built-in defaults below every other source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("tracker.application_id", "eventline")?
        .set_default("tracker.active", true)?
        .set_default("queue.batch_size", 10)?
        .set_default("queue.batch_delay_ms", 1000)?
        .set_default("queue.concurrency", 4)?
        .set_default("retry.max_attempts", 10)?
        .set_default("retry.min_timeout_ms", 1000)?
        .set_default("retry.retry_factor", 2.0)?
        .set_default("wait.interval_ms", 100)
}
