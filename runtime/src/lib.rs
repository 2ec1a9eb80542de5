//! LiveMap: adaptive spatial crawler for live traffic alert feeds.
//!
//! The crawler covers a fixed bounding box with one feed request, splits the
//! box into quadrants whenever the feed reports as many alerts as it will
//! return at once, and stores every alert exactly once keyed by its uuid.

pub mod acquisition;
pub mod audit;
pub mod cartography;
pub mod cli;
pub mod config;
pub mod export;
pub mod store;
