//! `livemap export`: write the stored alerts as GeoJSON.

use crate::cli::output::{self, Styled};
use crate::cli::progress;
use crate::config::Settings;
use crate::export::geojson::{self, GEOJSON_FILE};
use crate::store::alert_store::AlertStore;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Export every stored alert to `out_dir/alerts.json`.
pub fn run(settings: &Settings, out_dir: &Path) -> Result<()> {
    let s = Styled::new();
    let start = Instant::now();

    let store = AlertStore::open_read_only(&settings.db_path)
        .with_context(|| format!("failed to open alert store: {}", settings.db_path.display()))?;
    let total = store.count()?;

    let bar = progress::create_export_bar(total, "GeoJSON export");
    let written = geojson::export_to_dir(&store, out_dir, &bar)?;
    bar.finish_and_clear();

    let path = out_dir.join(GEOJSON_FILE);
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "features": written,
            "elapsed_ms": start.elapsed().as_millis() as u64,
        }));
    } else if !output::is_quiet() {
        eprintln!(
            "  {} Exported {written} alerts to {} {}",
            s.ok_sym(),
            path.display(),
            s.dim(&format!("({:.1}s)", start.elapsed().as_secs_f64()))
        );
    }

    Ok(())
}
