//! Workspace config file source: eventline.toml in the workspace root

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

pub const WORKSPACE_CONFIG_FILE: &str = "eventline.toml";

/// Add `eventline.toml` from the workspace root, when present.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if !path.exists() {
        return Ok(builder);
    }
    debug!(config_path = %path.display(), "Loading workspace config");
    Ok(builder.add_source(File::from(path).required(false)))
}
