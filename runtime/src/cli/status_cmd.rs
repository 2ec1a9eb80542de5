//! `livemap status`: summarize what the alert store holds.

use crate::cli::output::{self, Styled};
use crate::config::Settings;
use crate::store::alert_store::AlertStore;
use anyhow::Result;

/// Print record count, newest alert time, and per-type counts.
pub fn run(settings: &Settings) -> Result<()> {
    let s = Styled::new();

    let store = match AlertStore::open_read_only(&settings.db_path) {
        Ok(store) => store,
        Err(_) => {
            if output::is_json() {
                output::print_json(&serde_json::json!({
                    "error": "not_found",
                    "message": format!("No alert store at {}", settings.db_path.display()),
                }));
                return Ok(());
            }
            eprintln!(
                "  {} No alert store at {}. Run 'livemap crawl' first.",
                s.warn_sym(),
                settings.db_path.display()
            );
            std::process::exit(1);
        }
    };

    let total = store.count()?;
    let newest = store.newest_pub_millis()?;
    let by_type = store.count_by_type()?;

    if output::is_json() {
        let types: serde_json::Map<String, serde_json::Value> = by_type
            .iter()
            .map(|(kind, n)| (kind.clone(), serde_json::json!(n)))
            .collect();
        output::print_json(&serde_json::json!({
            "db_path": settings.db_path.display().to_string(),
            "alerts": total,
            "newest_pub_millis": newest,
            "by_type": types,
        }));
        return Ok(());
    }

    output::print_header(&s);
    output::print_section(&s, "Store");
    output::print_check(s.ok_sym(), "Path", &settings.db_path.display().to_string());
    output::print_check(s.ok_sym(), "Alerts", &total.to_string());
    output::print_check(
        s.ok_sym(),
        "Newest",
        &newest
            .map(output::format_millis)
            .unwrap_or_else(|| "none".to_string()),
    );

    if !by_type.is_empty() {
        eprintln!();
        output::print_section(&s, "By type");
        for (kind, n) in &by_type {
            let label = if kind.is_empty() { "(none)" } else { kind };
            output::print_check(s.dim("-").as_str(), label, &n.to_string());
        }
    }

    Ok(())
}
