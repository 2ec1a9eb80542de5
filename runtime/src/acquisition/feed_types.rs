//! Typed view of the live-map alert feed payload.
//!
//! The feed answers with a JSON object that carries an `error` field, an
//! `alerts` array, or neither. Each alert must carry `uuid`, `type`,
//! `pubMillis` and a `location`; anything else in the payload is ignored.

use serde::{Deserialize, Deserializer};

/// One alert item as returned by the feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAlert {
    pub uuid: String,
    #[serde(rename = "type", deserialize_with = "category_code")]
    pub kind: String,
    #[serde(rename = "pubMillis")]
    pub pub_millis: i64,
    pub location: RawLocation,
}

/// Feed coordinates: `x` is longitude, `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawLocation {
    pub x: f64,
    pub y: f64,
}

/// Outcome of a single feed request.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedResult {
    /// The feed answered with zero or more alerts.
    Alerts(Vec<RawAlert>),
    /// The feed answered but left out the `alerts` collection.
    EmptyResponse,
    /// The feed returned an application-level error payload.
    FeedError(String),
    /// The request did not complete or the body could not be understood.
    TransportFailure(String),
}

impl FeedResult {
    /// Short label used in logs and cycle reports.
    pub fn label(&self) -> &'static str {
        match self {
            FeedResult::Alerts(_) => "alerts",
            FeedResult::EmptyResponse => "empty",
            FeedResult::FeedError(_) => "feed_error",
            FeedResult::TransportFailure(_) => "transport_failure",
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    alerts: Option<Vec<RawAlert>>,
}

/// Classify a response body.
///
/// An `error` field wins over everything else; a missing `alerts` field is an
/// empty response. A body that is not JSON, or an alert missing a required
/// field, is a transport failure for the whole request.
pub fn classify_body(body: &[u8]) -> FeedResult {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(e) => e,
        Err(e) => return FeedResult::TransportFailure(format!("malformed feed body: {e}")),
    };

    match envelope {
        Envelope {
            error: Some(err), ..
        } => FeedResult::FeedError(error_message(err)),
        Envelope { alerts: None, .. } => FeedResult::EmptyResponse,
        Envelope {
            alerts: Some(alerts),
            ..
        } => FeedResult::Alerts(alerts),
    }
}

fn error_message(err: serde_json::Value) -> String {
    match err {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Accept the category either as a name (`"JAM"`) or as a numeric code.
fn category_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Name(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Name(name) => name,
        Code::Number(n) => n.to_string(),
    })
}
