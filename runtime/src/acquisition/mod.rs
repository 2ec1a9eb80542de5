//! Feed acquisition: the HTTP client and the typed payload it returns.

pub mod feed_client;
pub mod feed_types;
