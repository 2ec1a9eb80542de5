//! Environment-driven settings.
//!
//! Every key has a default; a key that falls back to it is reported once at
//! `warn`. A key that is present but unparseable is a startup error.

use crate::acquisition::feed_client::DEFAULT_FEED_URL;
use crate::cartography::crawler::CrawlConfig;
use crate::cartography::region::{Region, RegionError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DB_PATH: &str = "DB_PATH";
pub const MAX_ALERTS: &str = "MAX_ALERTS";
pub const AREA_TOP: &str = "AREA_TOP";
pub const AREA_BOTTOM: &str = "AREA_BOTTOM";
pub const AREA_LEFT: &str = "AREA_LEFT";
pub const AREA_RIGHT: &str = "AREA_RIGHT";
pub const QUERY_COOLDOWN: &str = "QUERY_COOLDOWN";
pub const QUERY_DELAY: &str = "QUERY_DELAY";
pub const MAX_DEPTH: &str = "MAX_DEPTH";
pub const FEED_URL: &str = "FEED_URL";
pub const FEED_TIMEOUT: &str = "FEED_TIMEOUT";
pub const SOURCE_PATH: &str = "SOURCE_PATH";

const DEFAULTS: &[(&str, &str)] = &[
    (DB_PATH, "./cache/database.db"),
    (MAX_ALERTS, "200"),
    (AREA_TOP, "-10.683"),
    (AREA_BOTTOM, "-43.633"),
    (AREA_LEFT, "113.15"),
    (AREA_RIGHT, "153.633"),
    (QUERY_COOLDOWN, "600"),
    (QUERY_DELAY, "0"),
    (MAX_DEPTH, "24"),
    (FEED_URL, DEFAULT_FEED_URL),
    (FEED_TIMEOUT, "15000"),
    (SOURCE_PATH, "./cache"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable '{key}' has invalid value '{value}' (expected {expected})")]
    InvalidNumber {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid crawl area: {0}")]
    InvalidRegion(#[from] RegionError),
    #[error("MAX_ALERTS must be at least 1")]
    ZeroCapacity,
}

/// Resolved settings for every subcommand.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub capacity: usize,
    pub area: Region,
    pub cooldown: Duration,
    pub request_delay_ms: u64,
    pub max_depth: u32,
    pub feed_url: String,
    pub feed_timeout_ms: u64,
    pub source_path: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| -> String {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    warn!("environment variable '{key}' not found, using default");
                    default_for(key).to_string()
                }
            }
        };

        let capacity: usize = parse(MAX_ALERTS, &get(MAX_ALERTS), "a positive integer")?;
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let area = Region::new(
            parse(AREA_TOP, &get(AREA_TOP), "a float")?,
            parse(AREA_BOTTOM, &get(AREA_BOTTOM), "a float")?,
            parse(AREA_LEFT, &get(AREA_LEFT), "a float")?,
            parse(AREA_RIGHT, &get(AREA_RIGHT), "a float")?,
        )?;

        let cooldown_s: u64 = parse(QUERY_COOLDOWN, &get(QUERY_COOLDOWN), "seconds")?;

        Ok(Self {
            db_path: PathBuf::from(get(DB_PATH)),
            capacity,
            area,
            cooldown: Duration::from_secs(cooldown_s),
            request_delay_ms: parse(QUERY_DELAY, &get(QUERY_DELAY), "milliseconds")?,
            max_depth: parse(MAX_DEPTH, &get(MAX_DEPTH), "a non-negative integer")?,
            feed_url: get(FEED_URL),
            feed_timeout_ms: parse(FEED_TIMEOUT, &get(FEED_TIMEOUT), "milliseconds")?,
            source_path: PathBuf::from(get(SOURCE_PATH)),
        })
    }

    /// Crawl parameters derived from these settings.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            root: self.area,
            capacity: self.capacity,
            max_depth: self.max_depth,
            cooldown: self.cooldown,
            request_delay_ms: self.request_delay_ms,
        }
    }
}

fn default_for(key: &str) -> &'static str {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or_default()
}

fn parse<T: FromStr>(key: &'static str, value: &str, expected: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
        expected,
    })
}
