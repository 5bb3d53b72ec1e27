//! Pipeline configuration.

use std::time::Duration;

use parody_cache::DEFAULT_TTL;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Lifetime of cached storylines
    pub storyline_ttl: Duration,
    /// Lifetime of cached videos and thumbnails
    pub media_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storyline_ttl: DEFAULT_TTL,
            media_ttl: DEFAULT_TTL,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// `CACHE_TTL_SECS` sets both lifetimes; the per-artifact variables
    /// override it.
    pub fn from_env() -> Self {
        let base = env_secs("CACHE_TTL_SECS").unwrap_or(DEFAULT_TTL);

        Self {
            storyline_ttl: env_secs("STORYLINE_CACHE_TTL_SECS").unwrap_or(base),
            media_ttl: env_secs("MEDIA_CACHE_TTL_SECS").unwrap_or(base),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
