//! Audit trail of completed crawl cycles.

pub mod cycle_log;
