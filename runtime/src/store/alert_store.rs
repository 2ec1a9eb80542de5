//! Deduplicated alert table backed by SQLite.
//!
//! The only write the crawler performs is "insert if the uuid is absent", so
//! repeated sightings of the same alert across cycles are free and never
//! surface as errors.

use crate::acquisition::feed_types::RawAlert;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use thiserror::Error;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS data (
    uuid TEXT PRIMARY KEY,
    type TEXT,
    pubMillis INTEGER,
    latitude REAL,
    longitude REAL
);";

const INSERT_OR_IGNORE: &str = "INSERT OR IGNORE INTO data (uuid, type, pubMillis, latitude, longitude)
     VALUES (?1, ?2, ?3, ?4, ?5)";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare store directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One persisted alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub uuid: String,
    pub kind: String,
    pub pub_millis: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<RawAlert> for AlertRecord {
    fn from(raw: RawAlert) -> Self {
        Self {
            uuid: raw.uuid,
            kind: raw.kind,
            pub_millis: raw.pub_millis,
            latitude: raw.location.y,
            longitude: raw.location.x,
        }
    }
}

/// SQLite alert store.
pub struct AlertStore {
    db: Connection,
}

impl AlertStore {
    /// Open or create the store, creating parent directories and the table.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Connection::open(path)?;
        db.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(db)
    }

    /// Open an existing store without write access, for exporters.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let db = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { db })
    }

    /// Private in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Insert a record unless its uuid is already stored.
    ///
    /// Returns `true` when a new row was written.
    pub fn insert_if_absent(&self, record: &AlertRecord) -> Result<bool, StoreError> {
        let rows = self.db.execute(
            INSERT_OR_IGNORE,
            params![
                record.uuid,
                record.kind,
                record.pub_millis,
                record.latitude,
                record.longitude
            ],
        )?;
        Ok(rows > 0)
    }

    /// Insert a batch in one transaction. Returns the number of new rows.
    pub fn ingest(&mut self, records: &[AlertRecord]) -> Result<usize, StoreError> {
        let tx = self.db.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_OR_IGNORE)?;
            for record in records {
                inserted += stmt.execute(params![
                    record.uuid,
                    record.kind,
                    record.pub_millis,
                    record.latitude,
                    record.longitude
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Total number of stored alerts.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM data", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Publication time of the most recent alert, if any.
    pub fn newest_pub_millis(&self) -> Result<Option<i64>, StoreError> {
        let newest = self
            .db
            .query_row("SELECT MAX(pubMillis) FROM data", [], |row| row.get(0))?;
        Ok(newest)
    }

    /// Alert counts per category, most frequent first.
    pub fn count_by_type(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let mut stmt = self.db.prepare(
            "SELECT COALESCE(type, ''), COUNT(*) FROM data GROUP BY type ORDER BY COUNT(*) DESC, type",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let n: i64 = row.get(1)?;
                Ok((kind, n as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Stream every stored alert to `f` in insertion order.
    pub fn for_each_alert<F>(&self, mut f: F) -> Result<(), StoreError>
    where
        F: FnMut(AlertRecord) -> Result<(), StoreError>,
    {
        let mut stmt = self.db.prepare(
            "SELECT uuid, COALESCE(type, ''), pubMillis, latitude, longitude FROM data ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            f(AlertRecord {
                uuid: row.get(0)?,
                kind: row.get(1)?,
                pub_millis: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
            })?;
        }
        Ok(())
    }
}
