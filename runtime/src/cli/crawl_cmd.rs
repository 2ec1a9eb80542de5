//! `livemap crawl`: poll the feed over the configured area, forever or once.

use crate::acquisition::feed_client::LiveMapClient;
use crate::audit::cycle_log::CycleLog;
use crate::cartography::crawler::{CycleReport, Crawler};
use crate::cli::output::{self, Styled};
use crate::config::Settings;
use crate::store::alert_store::AlertStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the crawler until Ctrl-C, or a single cycle when `once` is set.
pub async fn run(settings: &Settings, once: bool) -> Result<()> {
    let s = Styled::new();

    let store = AlertStore::open(&settings.db_path)
        .with_context(|| format!("failed to open alert store: {}", settings.db_path.display()))?;
    let client = LiveMapClient::new(&settings.feed_url, settings.feed_timeout_ms)
        .context("failed to build feed client")?;
    let mut cycle_log = CycleLog::in_dir(&settings.source_path)?;

    let mut crawler = Crawler::new(Arc::new(client), store, settings.crawl_config());

    if !output::is_quiet() && !output::is_json() {
        output::print_header(&s);
        output::print_check(s.ok_sym(), "Area", &settings.area.to_string());
        output::print_check(s.ok_sym(), "Capacity", &settings.capacity.to_string());
        output::print_check(
            s.ok_sym(),
            "Cooldown",
            &output::format_duration(settings.cooldown.as_secs()),
        );
        output::print_check(s.ok_sym(), "Store", &settings.db_path.display().to_string());
        eprintln!();
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown.cancel();
    });

    info!("starting LiveMap v{}", env!("CARGO_PKG_VERSION"));

    if once {
        let report = crawler.run_cycle(&cancel).await;
        record(&mut cycle_log, &report);
        print_report(&s, &report);
        return Ok(());
    }

    crawler
        .run(&cancel, |report| {
            record(&mut cycle_log, report);
            print_report(&s, report);
        })
        .await;

    if !output::is_quiet() && !output::is_json() {
        eprintln!("  {} LiveMap stopped.", s.ok_sym());
    }
    Ok(())
}

fn record(log: &mut CycleLog, report: &CycleReport) {
    if let Err(e) = log.record(report) {
        warn!("failed to append to {}: {e:#}", log.path().display());
    }
}

fn print_report(s: &Styled, report: &CycleReport) {
    if output::is_json() {
        if let Ok(value) = serde_json::to_value(report) {
            output::print_json(&value);
        }
        return;
    }
    if output::is_quiet() {
        return;
    }

    let sym = if report.interrupted || report.skipped > 0 {
        s.warn_sym()
    } else {
        s.ok_sym()
    };
    eprintln!(
        "  {sym} Cycle {}: {} regions, {} new alerts ({} seen), {} skipped {}",
        report.cycle,
        report.regions_fetched,
        report.ingested_new,
        report.alerts_seen,
        report.skipped,
        s.dim(&format!(
            "[{}]",
            output::format_duration(report.elapsed_ms / 1000)
        )),
    );
}
