//! Progress display for long-running exports.
//!
//! Uses `indicatif`; bars are hidden in `--quiet` and `--json` modes so
//! structured output stays clean.

use crate::cli::output;
use indicatif::{ProgressBar, ProgressStyle};

const EXPORT_TEMPLATE: &str =
    "  {prefix} |{bar:40}| {percent:>3}% | {pos}/{len} | ETA: {eta}";

/// Create a determinate bar for exporting `total` rows.
pub fn create_export_bar(total: u64, label: &str) -> ProgressBar {
    if output::is_quiet() || output::is_json() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(EXPORT_TEMPLATE)
        .map(|s| s.progress_chars("\u{2588}\u{2591}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_prefix(label.to_string());
    bar
}
