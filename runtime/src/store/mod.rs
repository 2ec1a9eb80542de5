//! Persistent alert storage.

pub mod alert_store;

pub use alert_store::{AlertRecord, AlertStore, StoreError};
