//! CLI route: run context and command dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cli::output::{format_replay_summary, ReplaySummary};
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, EventlineConfig};
use crate::event::EventAttributes;
use crate::queue::TrackerQueue;
use crate::tracker::{TrackEventOptions, Tracker, WaitForQueueOptions};
use crate::transport::{DebugTransport, RetryTransport, SharedTransport};

/// Runtime context for CLI execution: workspace and effective configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: EventlineConfig,
}

impl RunContext {
    /// Load configuration from `config_path` when given, otherwise from the workspace.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ConfigLoader::load(&workspace_root).with_context(|| {
                format!("Failed to load config for {}", workspace_root.display())
            })?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: EventlineConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &EventlineConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Replay {
                input,
                application_id,
                batch_size,
                no_retry,
                format,
            } => {
                let mut config = self.config.clone();
                if let Some(application_id) = application_id {
                    config.tracker.application_id = application_id.clone();
                }
                if let Some(batch_size) = batch_size {
                    config.queue.batch_size = *batch_size;
                }
                let summary = match input {
                    Some(path) => {
                        let path = self.resolve(path);
                        let file = tokio::fs::File::open(&path)
                            .await
                            .with_context(|| format!("Failed to open {}", path.display()))?;
                        replay(&config, BufReader::new(file), !no_retry).await?
                    }
                    None => replay(&config, BufReader::new(tokio::io::stdin()), !no_retry).await?,
                };
                Ok(format_replay_summary(&summary, *format))
            }
            Commands::Config => serde_json::to_string_pretty(&self.config)
                .context("Failed to serialize configuration"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

/// Build a tracker delivering to a [`DebugTransport`], track one event per
/// non-empty line, then wait for the queue to drain.
pub(crate) async fn replay<R>(
    config: &EventlineConfig,
    reader: R,
    with_retry: bool,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let queue = TrackerQueue::new(config.queue_config()).context("Invalid queue configuration")?;
    let debug: SharedTransport = Arc::new(DebugTransport::new());
    let transport: SharedTransport = if with_retry {
        Arc::new(RetryTransport::new(debug, config.retry_policy()).context("Invalid retry policy")?)
    } else {
        debug
    };

    let mut builder = Tracker::builder(config.tracker.application_id.clone())
        .queue(queue.clone())
        .transport(transport)
        .wait_defaults(config.wait_options());
    if let Some(tracker_id) = &config.tracker.tracker_id {
        builder = builder.tracker_id(tracker_id.clone());
    }
    let tracker = builder.build().context("Failed to build tracker")?;

    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let attributes: EventAttributes = match serde_json::from_str(line) {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed event");
                summary.malformed += 1;
                continue;
            }
        };
        match tracker.track_event(attributes, TrackEventOptions::default()).await {
            Ok(_) => summary.tracked += 1,
            Err(e) => {
                warn!(line = line_number, error = %e, "Event rejected");
                summary.rejected += 1;
            }
        }
    }

    summary.drained = tracker.wait_for_queue(&drain_options(config, summary.tracked)).await;
    let stats = queue.stats();
    summary.delivered_batches = stats.delivered_batches;
    summary.failed_batches = stats.failed_batches;
    summary.pending = stats.pending;
    info!(
        tracked = summary.tracked,
        drained = summary.drained,
        "Replay finished"
    );
    Ok(summary)
}

/// Upper bound for the computed drain wait
const MAX_DRAIN_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Configured wait, or enough batch delays to cover every tracked event.
fn drain_options(config: &EventlineConfig, tracked: usize) -> WaitForQueueOptions {
    let mut options = config.wait_options();
    if options.timeout.is_none() {
        let queue = config.queue_config();
        let per_round = queue.batch_size.saturating_mul(queue.concurrency).max(1);
        let rounds = u32::try_from(tracked.div_ceil(per_round))
            .unwrap_or(u32::MAX)
            .saturating_add(2);
        let timeout = queue
            .batch_delay
            .max(Duration::from_millis(100))
            .saturating_mul(rounds);
        options.timeout = Some(timeout.min(MAX_DRAIN_TIMEOUT));
    }
    options
}
