//! In-process TTL cache.
//!
//! Shared by all concurrent generation requests to avoid repeating
//! expensive remote calls:
//! - Deterministic key derivation over parameter objects
//! - Lazy eviction on read, explicit `cleanup` sweep
//! - `get_or_compute` that only stores successful results

pub mod key;
pub mod metrics;
pub mod ttl;

pub use key::generate_key;
pub use ttl::{CacheStats, TtlCache, DEFAULT_TTL};
