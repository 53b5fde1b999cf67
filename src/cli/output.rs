//! CLI output: summaries and error mapping.

use serde::Serialize;

use super::parse::OutputFormat;

/// Outcome of a `replay` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub tracked: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub delivered_batches: usize,
    pub failed_batches: usize,
    pub pending: usize,
    pub drained: bool,
}

pub fn format_replay_summary(summary: &ReplaySummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(summary)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputFormat::Text => {
            let mut out = format!(
                "Tracked {} event(s) ({} malformed, {} rejected by plugins)\n",
                summary.tracked, summary.malformed, summary.rejected
            );
            out.push_str(&format!(
                "Batches delivered: {}, failed: {}\n",
                summary.delivered_batches, summary.failed_batches
            ));
            if summary.drained {
                out.push_str("Queue drained");
            } else {
                out.push_str(&format!(
                    "Queue not drained: {} event(s) still pending",
                    summary.pending
                ));
            }
            out
        }
    }
}

/// Map errors to a string for CLI output, including the cause chain.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("Error: {:#}", e)
}
