//! Density-triggered subdivision decision.

use super::region::Region;
use crate::acquisition::feed_types::{FeedResult, RawAlert};

/// What the crawler should do with a fetched region.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nothing to persist and nothing to requeue.
    Ignore { reason: String },
    /// The response looks truncated: crawl the four quadrants instead.
    Subdivide([Region; 4]),
    /// The response is complete: persist every alert.
    Ingest(Vec<RawAlert>),
    /// The response looks truncated but the region cannot be split further.
    /// Persist what arrived.
    IngestTruncated(Vec<RawAlert>),
}

/// Decide how to handle a feed result for `region`.
///
/// A response holding `capacity` or more alerts is assumed truncated, so the
/// boundary itself subdivides. A region too small to split any further in
/// floating point keeps what it got as a truncated ingest.
pub fn decide(region: &Region, result: FeedResult, capacity: usize) -> Action {
    match result {
        FeedResult::Alerts(alerts) if alerts.len() >= capacity => match region.quadrants() {
            Some(children) => Action::Subdivide(children),
            None => Action::IngestTruncated(alerts),
        },
        FeedResult::Alerts(alerts) => Action::Ingest(alerts),
        FeedResult::EmptyResponse => Action::Ignore {
            reason: "no 'alerts' key in feed response".to_string(),
        },
        FeedResult::FeedError(message) => Action::Ignore {
            reason: format!("feed error: '{message}'"),
        },
        FeedResult::TransportFailure(message) => Action::Ignore { reason: message },
    }
}
