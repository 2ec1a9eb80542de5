//! Read-only exports of the alert store for downstream tools.

pub mod geojson;
