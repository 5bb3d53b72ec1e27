//! HTTP handlers.

pub mod cache;
pub mod generate;
pub mod health;

pub use cache::{cache_stats, cleanup_cache, clear_cache};
pub use generate::{generate, generate_batch, storyline_only};
pub use health::health;
