//! Log filter selection for the binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "livemap=info";
const QUIET_DIRECTIVE: &str = "livemap=warn";

/// Build the subscriber filter.
///
/// A non-empty, parseable `RUST_LOG` value is used as-is. Otherwise the
/// crate logs at `info`, or `warn` under `--quiet`.
pub fn log_filter(rust_log: Option<&str>, quiet: bool) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(if quiet { QUIET_DIRECTIVE } else { DEFAULT_DIRECTIVE }))
}
