//! CLI parse: clap types for Eventline. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Eventline CLI - event instrumentation pipeline tools
#[derive(Parser)]
#[command(name = "eventline")]
#[command(about = "Replay and inspect event instrumentation pipelines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (searched for eventline.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track newline-delimited JSON events through a debug transport
    Replay {
        /// Input file (reads stdin when omitted)
        input: Option<PathBuf>,
        /// Override the configured application id
        #[arg(long)]
        application_id: Option<String>,
        /// Override the configured queue batch size
        #[arg(long)]
        batch_size: Option<usize>,
        /// Deliver without the retry wrapper
        #[arg(long)]
        no_retry: bool,
        /// Summary format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the effective configuration as JSON
    Config,
}
