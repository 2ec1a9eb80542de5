//! Crawl engine: regions, the subdivision policy, pacing, and the scheduler.

pub mod crawler;
pub mod pacing;
pub mod region;
pub mod subdivide;

pub use crawler::{CrawlConfig, Crawler, CycleReport};
pub use region::Region;
