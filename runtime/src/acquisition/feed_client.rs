//! HTTP client for the live-map alert feed.
//!
//! One call to [`AlertFeed::fetch`] is one outbound request for one region.
//! No retries happen here; the crawler decides what a failure means.

use super::feed_types::{classify_body, FeedResult};
use crate::cartography::region::Region;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Public live-map endpoint.
pub const DEFAULT_FEED_URL: &str = "https://www.waze.com/live-map/api/georss";

/// Source of alerts for a bounded area.
#[async_trait]
pub trait AlertFeed: Send + Sync {
    /// Query the feed for one region.
    async fn fetch(&self, region: &Region) -> FeedResult;
}

/// `reqwest`-backed feed client.
pub struct LiveMapClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl LiveMapClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout_ms: u64) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("livemap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Query string parameters for a region.
    fn query(region: &Region) -> [(&'static str, String); 6] {
        [
            ("top", region.top().to_string()),
            ("bottom", region.bottom().to_string()),
            ("left", region.left().to_string()),
            ("right", region.right().to_string()),
            ("env", "row".to_string()),
            ("types", "alerts".to_string()),
        ]
    }
}

#[async_trait]
impl AlertFeed for LiveMapClient {
    async fn fetch(&self, region: &Region) -> FeedResult {
        let response = self
            .client
            .get(&self.base_url)
            .query(&Self::query(region))
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FeedResult::TransportFailure(format!("request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return FeedResult::TransportFailure(format!("feed answered HTTP {status}"));
        }

        match response.bytes().await {
            Ok(body) => {
                debug!(bytes = body.len(), "feed response received");
                classify_body(&body)
            }
            Err(e) => FeedResult::TransportFailure(format!("failed to read body: {e}")),
        }
    }
}
