//! CLI subcommand implementations for the `livemap` binary.

pub mod crawl_cmd;
pub mod export_cmd;
pub mod logging;
pub mod output;
pub mod progress;
pub mod status_cmd;
