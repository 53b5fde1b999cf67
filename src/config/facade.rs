//! Config loading entry point: layers the sources and validates the result.

use std::path::Path;

use config::File;
use tracing::debug;

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::EventlineConfig;
use crate::error::TrackerError;

/// Loads [`EventlineConfig`] from layered sources.
///
/// Precedence, lowest first: defaults, user config file, workspace
/// `eventline.toml`, `EVENTLINE__*` environment variables.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(workspace_root: &Path) -> Result<EventlineConfig, TrackerError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: EventlineConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Load an explicit file (it must exist), still honouring environment overrides.
    pub fn load_from_file(path: &Path) -> Result<EventlineConfig, TrackerError> {
        if !path.exists() {
            return Err(TrackerError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);

        let config: EventlineConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    fn validated(config: EventlineConfig) -> Result<EventlineConfig, TrackerError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            TrackerError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        debug!(
            application_id = %config.tracker.application_id,
            batch_size = config.queue.batch_size,
            concurrency = config.queue.concurrency,
            "Configuration loaded"
        );
        Ok(config)
    }
}
