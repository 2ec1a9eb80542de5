//! Streaming GeoJSON export of the alert store.
//!
//! Rows are written one feature at a time, so the export never holds the
//! whole table in memory.

use crate::store::alert_store::{AlertRecord, AlertStore, StoreError};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File name written inside the output directory.
pub const GEOJSON_FILE: &str = "alerts.json";

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Point,
    properties: Properties<'a>,
}

#[derive(Serialize)]
struct Point {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

#[derive(Serialize)]
struct Properties<'a> {
    uuid: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(rename = "pubMillis")]
    pub_millis: i64,
}

impl<'a> From<&'a AlertRecord> for Feature<'a> {
    fn from(record: &'a AlertRecord) -> Self {
        Feature {
            kind: "Feature",
            geometry: Point {
                kind: "Point",
                coordinates: [record.longitude, record.latitude],
            },
            properties: Properties {
                uuid: &record.uuid,
                kind: &record.kind,
                pub_millis: record.pub_millis,
            },
        }
    }
}

/// Write every stored alert as a `FeatureCollection` to `writer`.
///
/// Returns the number of features written.
pub fn write_feature_collection<W: Write>(
    store: &AlertStore,
    mut writer: W,
    progress: &ProgressBar,
) -> Result<u64> {
    writer.write_all(br#"{"type":"FeatureCollection","features":["#)?;

    let mut written = 0u64;
    store.for_each_alert(|record| {
        if written > 0 {
            writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut writer, &Feature::from(&record)).map_err(std::io::Error::from)?;
        written += 1;
        progress.inc(1);
        Ok::<(), StoreError>(())
    })?;

    writer.write_all(b"]}")?;
    writer.flush()?;
    Ok(written)
}

/// Export to `dir/alerts.json`, creating `dir` if needed.
pub fn export_to_dir(store: &AlertStore, dir: &Path, progress: &ProgressBar) -> Result<u64> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let path = dir.join(GEOJSON_FILE);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    write_feature_collection(store, BufWriter::new(file), progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uuid: &str, lat: f64, lng: f64) -> AlertRecord {
        AlertRecord {
            uuid: uuid.to_string(),
            kind: "ACCIDENT".to_string(),
            pub_millis: 1_700_000_000_000,
            latitude: lat,
            longitude: lng,
        }
    }

    #[test]
    fn test_feature_collection_shape() {
        let mut store = AlertStore::in_memory().unwrap();
        store
            .ingest(&[record("a", -33.86, 151.21), record("b", -37.81, 144.96)])
            .unwrap();

        let mut out = Vec::new();
        let n = write_feature_collection(&store, &mut out, &ProgressBar::hidden()).unwrap();
        assert_eq!(n, 2);

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        let features = doc["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["type"], "Feature");
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            serde_json::json!([151.21, -33.86])
        );
        assert_eq!(features[0]["properties"]["uuid"], "a");
        assert_eq!(features[0]["properties"]["type"], "ACCIDENT");
        assert_eq!(features[0]["properties"]["pubMillis"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_empty_store() {
        let store = AlertStore::in_memory().unwrap();
        let mut out = Vec::new();
        write_feature_collection(&store, &mut out, &ProgressBar::hidden()).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["features"], serde_json::json!([]));
    }

    #[test]
    fn test_export_to_dir_advances_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AlertStore::in_memory().unwrap();
        store.ingest(&[record("a", 1.0, 2.0)]).unwrap();

        let progress = ProgressBar::hidden();
        export_to_dir(&store, &dir.path().join("out"), &progress).unwrap();

        assert_eq!(progress.position(), 1);
        let text = std::fs::read_to_string(dir.path().join("out").join(GEOJSON_FILE)).unwrap();
        assert!(text.starts_with(r#"{"type":"FeatureCollection""#));
    }
}
