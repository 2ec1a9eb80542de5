//! JSONL cycle log: one line per completed crawl cycle.

use crate::cartography::crawler::CycleReport;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name inside the output directory.
pub const CYCLE_LOG_FILE: &str = "cycles.jsonl";

/// Append-only JSONL log of cycle reports.
pub struct CycleLog {
    file: File,
    path: PathBuf,
}

impl CycleLog {
    /// Open or create the log file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open cycle log: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open `cycles.jsonl` inside `dir`.
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::open(&dir.join(CYCLE_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one report.
    pub fn record(&mut self, report: &CycleReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }
}
