//! Cache metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Cache hits by key prefix.
    pub const HITS_TOTAL: &str = "parody_cache_hits_total";

    /// Cache misses by key prefix.
    pub const MISSES_TOTAL: &str = "parody_cache_misses_total";

    /// Entries removed because their TTL elapsed.
    pub const EVICTIONS_TOTAL: &str = "parody_cache_evictions_total";
}

pub fn record_hit(key: &str) {
    counter!(names::HITS_TOTAL, "prefix" => prefix_of(key)).increment(1);
}

pub fn record_miss(key: &str) {
    counter!(names::MISSES_TOTAL, "prefix" => prefix_of(key)).increment(1);
}

pub fn record_evictions(count: usize) {
    counter!(names::EVICTIONS_TOTAL).increment(count as u64);
}

/// Label value for a key: everything before the first `:`.
fn prefix_of(key: &str) -> String {
    key.split(':').next().unwrap_or(key).to_string()
}
