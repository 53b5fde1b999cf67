//! CLI domain: parse, route and output only.
//! Commands build trackers through the library; no delivery logic lives here.

mod output;
mod parse;
mod route;

pub use output::{format_replay_summary, map_error, ReplaySummary};
pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
