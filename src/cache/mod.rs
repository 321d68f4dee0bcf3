//! Two-tier cache for API responses
//!
//! This module provides a cache manager with a bounded in-memory tier backed by
//! JSON files on disk. Entries carry a write timestamp and are validated lazily
//! against a caller-supplied TTL at read time, so stale data can still be served
//! when the network is unavailable. Storage-layer failures never escape the
//! cache: they degrade to cache-miss behavior and are logged.

mod manager;

pub use manager::{CacheManager, MAX_MEMORY_CACHE_SIZE};

/// Key prefixes shared by the subsystems that persist through the same store.
///
/// Keeping the prefixes in one place lets `CacheManager::clear_all` remove
/// every entry the application owns without touching unrelated files.
pub mod namespace {
    /// Weather forecast entries, keyed by rounded coordinates.
    pub const WEATHER: &str = "weather";
    /// Last-known-location entries.
    pub const LOCATION: &str = "location";
    /// User settings persisted through the shared store.
    pub const SETTINGS: &str = "settings";

    pub(crate) const ALL: [&str; 3] = [WEATHER, LOCATION, SETTINGS];

    /// Returns true if `key` belongs to one of the application's namespaces.
    pub(crate) fn contains(key: &str) -> bool {
        ALL.iter()
            .any(|ns| key == *ns || (key.starts_with(ns) && key[ns.len()..].starts_with(':')))
    }
}

/// Builds a cache key from a namespace and coordinates rounded to 2 decimal
/// places (~1.1 km resolution).
///
/// Rounding deliberately collapses requests for near-identical coordinates
/// into a single cache slot.
pub fn coordinate_key(namespace: &str, latitude: f64, longitude: f64) -> String {
    format!("{namespace}:{latitude:.2}:{longitude:.2}")
}
