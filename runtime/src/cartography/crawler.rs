//! Depth-first crawl scheduler with density-triggered subdivision.
//!
//! A cycle seeds the work queue with the root region and drains it: every
//! region is fetched once, then either ignored, split into quadrants that are
//! pushed back onto the same queue, or ingested into the store. Cycles repeat
//! forever, spaced at least `cooldown` apart from start to start.

use super::pacing::{cooldown_remaining, sleep_or_cancel, RequestPacer};
use super::region::Region;
use super::subdivide::{decide, Action};
use crate::acquisition::feed_client::AlertFeed;
use crate::acquisition::feed_types::{FeedResult, RawAlert};
use crate::store::alert_store::{AlertRecord, AlertStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Crawl parameters.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Area seeded at the start of every cycle.
    pub root: Region,
    /// Alert count at which a response is treated as truncated.
    pub capacity: usize,
    /// Regions at this depth are ingested even when they hit capacity.
    pub max_depth: u32,
    /// Minimum spacing between cycle starts.
    pub cooldown: Duration,
    /// Pause after each region, in milliseconds.
    pub request_delay_ms: u64,
}

/// Summary of one drain of the work queue.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub regions_fetched: usize,
    pub subdivided: usize,
    pub alerts_seen: usize,
    pub ingested_new: usize,
    pub skipped: usize,
    /// Saturated regions ingested without splitting.
    pub depth_limited: usize,
    pub deepest: u32,
    pub interrupted: bool,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            started_at: Utc::now(),
            elapsed_ms: 0,
            regions_fetched: 0,
            subdivided: 0,
            alerts_seen: 0,
            ingested_new: 0,
            skipped: 0,
            depth_limited: 0,
            deepest: 0,
            interrupted: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedRegion {
    region: Region,
    depth: u32,
}

/// Owns the work queue, the feed and the store for the lifetime of the crawl.
pub struct Crawler {
    feed: Arc<dyn AlertFeed>,
    store: AlertStore,
    config: CrawlConfig,
    pacer: RequestPacer,
    queue: Vec<QueuedRegion>,
    cycles: u64,
}

impl Crawler {
    pub fn new(feed: Arc<dyn AlertFeed>, store: AlertStore, config: CrawlConfig) -> Self {
        let pacer = RequestPacer::new(config.request_delay_ms);
        Self {
            feed,
            store,
            config,
            pacer,
            queue: Vec::new(),
            cycles: 0,
        }
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    /// Run cycles until `cancel` fires, handing each report to `on_cycle`.
    pub async fn run<C>(&mut self, cancel: &CancellationToken, mut on_cycle: C)
    where
        C: FnMut(&CycleReport),
    {
        loop {
            let cycle_start = Instant::now();
            let report = self.run_cycle(cancel).await;
            on_cycle(&report);

            if report.interrupted || cancel.is_cancelled() {
                info!(cycle = report.cycle, "crawl stopped");
                return;
            }

            let remaining = cooldown_remaining(cycle_start, self.config.cooldown);
            if remaining.is_zero() {
                info!(cycle = report.cycle, "cooldown already elapsed, starting next cycle");
            } else {
                info!(
                    cycle = report.cycle,
                    wait_s = remaining.as_secs(),
                    "cooling down before next cycle"
                );
            }

            if !sleep_or_cancel(remaining, cancel).await {
                info!("crawl stopped during cooldown");
                return;
            }
        }
    }

    /// Seed the queue with the root region and drain it.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport::new(self.cycles);
        let started = Instant::now();

        self.queue.clear();
        self.queue.push(QueuedRegion {
            region: self.config.root,
            depth: 0,
        });
        info!(cycle = report.cycle, root = %self.config.root, "cycle started");

        loop {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let Some(item) = self.queue.pop() else {
                break;
            };

            self.process(item, &mut report).await;

            if !self.queue.is_empty() && !self.pacer.pause(cancel).await {
                report.interrupted = true;
                break;
            }
        }

        if report.interrupted {
            info!(
                cycle = report.cycle,
                pending = self.queue.len(),
                "cycle interrupted"
            );
            self.queue.clear();
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            cycle = report.cycle,
            regions = report.regions_fetched,
            subdivided = report.subdivided,
            alerts = report.alerts_seen,
            new = report.ingested_new,
            skipped = report.skipped,
            deepest = report.deepest,
            elapsed_ms = report.elapsed_ms,
            "cycle finished"
        );
        report
    }

    /// Fetch one region and act on the decision.
    async fn process(&mut self, item: QueuedRegion, report: &mut CycleReport) {
        let result = self.feed.fetch(&item.region).await;
        report.regions_fetched += 1;
        report.deepest = report.deepest.max(item.depth);

        debug!(
            queue = self.queue.len(),
            depth = item.depth,
            region = %item.region,
            outcome = result.label(),
            "data retrieved"
        );

        let capacity = self.capacity_at(item, &result, report);
        match decide(&item.region, result, capacity) {
            Action::Ignore { reason } => {
                report.skipped += 1;
                info!(region = %item.region, "skipping region: {reason}");
            }
            Action::Subdivide(children) => {
                report.subdivided += 1;
                self.queue
                    .extend(children.into_iter().map(|region| QueuedRegion {
                        region,
                        depth: item.depth + 1,
                    }));
            }
            Action::Ingest(alerts) => self.ingest(item, alerts, report),
            Action::IngestTruncated(alerts) => {
                report.depth_limited += 1;
                warn!(
                    region = %item.region,
                    depth = item.depth,
                    alerts = alerts.len(),
                    "region too small to split, ingesting possibly truncated response"
                );
                self.ingest(item, alerts, report);
            }
        }
    }

    fn ingest(&mut self, item: QueuedRegion, alerts: Vec<RawAlert>, report: &mut CycleReport) {
        report.alerts_seen += alerts.len();
        let records: Vec<AlertRecord> = alerts.into_iter().map(AlertRecord::from).collect();
        match self.store.ingest(&records) {
            Ok(inserted) => report.ingested_new += inserted,
            Err(e) => {
                report.skipped += 1;
                warn!(region = %item.region, "failed to store alerts: {e}");
            }
        }
    }

    /// Capacity in force for `item`; unbounded once the depth guard is reached.
    fn capacity_at(&self, item: QueuedRegion, result: &FeedResult, report: &mut CycleReport) -> usize {
        if item.depth < self.config.max_depth {
            return self.config.capacity;
        }
        if let FeedResult::Alerts(alerts) = result {
            if alerts.len() >= self.config.capacity {
                report.depth_limited += 1;
                warn!(
                    region = %item.region,
                    depth = item.depth,
                    alerts = alerts.len(),
                    "depth limit reached, ingesting possibly truncated response"
                );
            }
        }
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::feed_types::{RawAlert, RawLocation};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&Region) -> FeedResult + Send + Sync>;

    /// Feed double that answers from a closure and records every call.
    struct ScriptedFeed {
        respond: Responder,
        latency: Duration,
        calls: Mutex<Vec<(Region, Instant)>>,
    }

    impl ScriptedFeed {
        fn new(respond: impl Fn(&Region) -> FeedResult + Send + Sync + 'static) -> Self {
            Self {
                respond: Box::new(respond),
                latency: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls(&self) -> Vec<(Region, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertFeed for ScriptedFeed {
        async fn fetch(&self, region: &Region) -> FeedResult {
            self.calls.lock().unwrap().push((*region, Instant::now()));
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            (self.respond)(region)
        }
    }

    fn alert(uuid: String, lat: f64, lng: f64) -> RawAlert {
        RawAlert {
            uuid,
            kind: "JAM".to_string(),
            pub_millis: 1_700_000_000_000,
            location: RawLocation { x: lng, y: lat },
        }
    }

    /// Feed over a fixed point set: returns at most `cap` points inside the region.
    fn point_feed(points: Vec<(f64, f64)>, cap: usize) -> ScriptedFeed {
        ScriptedFeed::new(move |region| {
            let alerts = points
                .iter()
                .enumerate()
                .filter(|(_, (lat, lng))| region.contains(*lat, *lng))
                .take(cap)
                .map(|(i, (lat, lng))| alert(format!("p-{i}"), *lat, *lng))
                .collect();
            FeedResult::Alerts(alerts)
        })
    }

    fn config(capacity: usize) -> CrawlConfig {
        CrawlConfig {
            root: Region::new(10.0, 0.0, 0.0, 10.0).unwrap(),
            capacity,
            max_depth: 24,
            cooldown: Duration::from_secs(600),
            request_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_sparse_root_ingests_directly() {
        let feed = Arc::new(point_feed(vec![(1.0, 1.0), (2.0, 2.0)], 5));
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), config(5));

        let report = crawler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(report.regions_fetched, 1);
        assert_eq!(report.subdivided, 0);
        assert_eq!(report.ingested_new, 2);
        assert_eq!(feed.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_children_drained_in_same_cycle() {
        // Seven points in one quadrant forces two levels of splitting.
        let points = vec![
            (9.0, 1.0),
            (9.5, 1.5),
            (8.0, 4.0),
            (6.0, 1.0),
            (6.5, 3.0),
            (7.0, 2.0),
            (8.5, 3.5),
        ];
        let feed = Arc::new(point_feed(points, 5));
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), config(5));

        let report = crawler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(report.subdivided, 2);
        assert_eq!(report.regions_fetched, 1 + 4 + 4);
        assert_eq!(report.deepest, 2);
        assert_eq!(crawler.store().count().unwrap(), 7);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_failed_region_is_not_requeued() {
        let feed = Arc::new(ScriptedFeed::new(|region| {
            if region.left() == 0.0 && region.top() == 10.0 && region.width() == 5.0 {
                FeedResult::TransportFailure("connection reset".to_string())
            } else if region.width() == 10.0 {
                FeedResult::Alerts(
                    (0..5)
                        .map(|i| alert(format!("root-{i}"), 1.0, 1.0))
                        .collect(),
                )
            } else {
                FeedResult::Alerts(vec![alert(format!("{}", region.left()), 1.0, 1.0)])
            }
        }));
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), config(5));

        let report = crawler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(report.regions_fetched, 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(feed.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_depth_guard_stops_saturated_feed() {
        // A feed that always reports capacity, regardless of area.
        let feed = Arc::new(ScriptedFeed::new(|region| {
            FeedResult::Alerts(
                (0..3)
                    .map(|i| alert(format!("{}-{}-{i}", region.top(), region.left()), 0.0, 0.0))
                    .collect(),
            )
        }));
        let mut cfg = config(3);
        cfg.max_depth = 2;
        let mut crawler = Crawler::new(feed, AlertStore::in_memory().unwrap(), cfg);

        let report = crawler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(report.regions_fetched, 1 + 4 + 16);
        assert_eq!(report.depth_limited, 16);
        assert_eq!(report.deepest, 2);
        assert_eq!(report.ingested_new, 16 * 3);
    }

    #[tokio::test]
    async fn test_unsplittable_saturated_region_is_counted() {
        let feed = Arc::new(ScriptedFeed::new(|_| {
            FeedResult::Alerts((0..3).map(|i| alert(format!("s-{i}"), 1.0, 0.5)).collect())
        }));
        let top = 1.0_f64;
        let mut cfg = config(3);
        cfg.root = Region::new(top, f64::from_bits(top.to_bits() - 1), 0.0, 1.0).unwrap();
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), cfg);

        let report = crawler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(report.regions_fetched, 1);
        assert_eq!(report.subdivided, 0);
        assert_eq!(report.depth_limited, 1);
        assert_eq!(report.ingested_new, 3);
        assert_eq!(feed.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_delay_between_regions() {
        let points = vec![(1.0, 1.0), (9.0, 9.0)];
        let feed = Arc::new(point_feed(points, 2));
        let mut cfg = config(2);
        cfg.request_delay_ms = 100;
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), cfg);

        crawler.run_cycle(&CancellationToken::new()).await;

        let calls = feed.calls();
        assert_eq!(calls.len(), 5);
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_floor_when_drain_is_fast() {
        let feed = Arc::new(
            point_feed(vec![(1.0, 1.0)], 5).with_latency(Duration::from_secs(30)),
        );
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), config(5));
        let cancel = CancellationToken::new();

        let mut cycles = 0;
        let stopper = cancel.clone();
        crawler
            .run(&cancel, |_| {
                cycles += 1;
                if cycles == 3 {
                    stopper.cancel();
                }
            })
            .await;

        let starts: Vec<Instant> = feed.calls().iter().map(|(_, at)| *at).collect();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(600));
            assert!(gap < Duration::from_secs(601));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_skipped_when_drain_is_slow() {
        let feed = Arc::new(
            point_feed(vec![(1.0, 1.0)], 5).with_latency(Duration::from_secs(900)),
        );
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), config(5));
        let cancel = CancellationToken::new();

        let mut cycles = 0;
        let stopper = cancel.clone();
        crawler
            .run(&cancel, |_| {
                cycles += 1;
                if cycles == 2 {
                    stopper.cancel();
                }
            })
            .await;

        let starts: Vec<Instant> = feed.calls().iter().map(|(_, at)| *at).collect();
        let gap = starts[1] - starts[0];
        assert!(gap >= Duration::from_secs(900));
        assert!(gap < Duration::from_secs(901));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_drain() {
        let points: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 / 4.0, i as f64 / 4.0)).collect();
        let feed = Arc::new(point_feed(points, 4));
        let mut cfg = config(4);
        cfg.request_delay_ms = 1_000;
        let mut crawler = Crawler::new(feed.clone(), AlertStore::in_memory().unwrap(), cfg);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            trigger.cancel();
        });

        let report = crawler.run_cycle(&cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.regions_fetched, 3);
    }

    #[tokio::test]
    async fn test_repeated_cycles_do_not_duplicate() {
        let feed = Arc::new(point_feed(vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)], 2));
        let mut crawler = Crawler::new(feed, AlertStore::in_memory().unwrap(), config(2));
        let cancel = CancellationToken::new();

        let first = crawler.run_cycle(&cancel).await;
        let second = crawler.run_cycle(&cancel).await;

        assert_eq!(first.ingested_new, 3);
        assert_eq!(second.ingested_new, 0);
        assert_eq!(second.cycle, 2);
        assert_eq!(crawler.store().count().unwrap(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// A feed capped at `capacity` still yields every point, in finitely many requests.
        #[test]
        fn prop_capped_feed_terminates_and_is_complete(
            points in prop::collection::vec((0.0f64..10.0, 0.0f64..10.0), 0..60),
            capacity in 2usize..8,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            // Coincident points can never be separated by splitting.
            let mut points = points;
            points.sort_by(|a, b| a.partial_cmp(b).unwrap());
            points.dedup();
            let expected = points.len() as u64;
            let feed = Arc::new(point_feed(points, capacity));
            let mut crawler = Crawler::new(feed, AlertStore::in_memory().unwrap(), config(capacity));

            let report = rt.block_on(crawler.run_cycle(&CancellationToken::new()));

            prop_assert!(!report.interrupted);
            prop_assert_eq!(crawler.store().count().unwrap(), expected);
            prop_assert_eq!(report.regions_fetched, 1 + 4 * report.subdivided);
        }
    }
}
