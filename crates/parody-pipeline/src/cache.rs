//! Process-wide store of generated artifacts.
//!
//! One instance is built at startup and shared by every request. Each
//! artifact type lives in its own [`TtlCache`]; key prefixes keep the key
//! spaces apart in logs and metrics.

use parody_cache::{generate_key, CacheStats, TtlCache};
use parody_models::{Classification, GenerationRequest, MediaOutput, Storyline};
use serde_json::json;

use crate::config::PipelineConfig;

pub const STORYLINE_PREFIX: &str = "storyline";
pub const VIDEO_PREFIX: &str = "video";
pub const THUMBNAIL_PREFIX: &str = "thumbnail";

/// Cached storylines, videos and thumbnails.
pub struct ArtifactCache {
    pub(crate) storylines: TtlCache<Storyline>,
    pub(crate) videos: TtlCache<MediaOutput>,
    pub(crate) thumbnails: TtlCache<String>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ArtifactCache {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            storylines: TtlCache::new(config.storyline_ttl),
            videos: TtlCache::new(config.media_ttl),
            thumbnails: TtlCache::new(config.media_ttl),
        }
    }

    /// Combined occupancy across all artifact types.
    pub async fn stats(&self) -> CacheStats {
        let parts = [
            self.storylines.stats().await,
            self.videos.stats().await,
            self.thumbnails.stats().await,
        ];

        parts.iter().fold(CacheStats::default(), |acc, s| CacheStats {
            total: acc.total + s.total,
            valid: acc.valid + s.valid,
            expired: acc.expired + s.expired,
        })
    }

    pub async fn clear(&self) {
        self.storylines.clear().await;
        self.videos.clear().await;
        self.thumbnails.clear().await;
    }

    /// Drop expired entries everywhere. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        self.storylines.cleanup().await + self.videos.cleanup().await + self.thumbnails.cleanup().await
    }
}

/// Key for a storyline: post text, author, classification and context.
pub fn storyline_key(request: &GenerationRequest, classification: Classification) -> String {
    generate_key(
        STORYLINE_PREFIX,
        &json!({
            "text": request.text,
            "author": request.author,
            "classification": classification,
            "context": request.context_summary(),
        }),
    )
}

/// Key for a video: its prompt, length, prompt style and seed image.
pub fn video_key(
    prompt: &str,
    target_duration: u32,
    classification: Classification,
    seed_image: Option<&str>,
) -> String {
    generate_key(
        VIDEO_PREFIX,
        &json!({
            "prompt": prompt,
            "duration": target_duration,
            "classification": classification,
            "seed_image": seed_image,
        }),
    )
}

/// Key for a thumbnail: the prompt it is generated from.
pub fn thumbnail_key(prompt: &str) -> String {
    generate_key(THUMBNAIL_PREFIX, &json!({ "prompt": prompt }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storyline_key_depends_on_classification_and_context() {
        let request = GenerationRequest::new("Company X ships feature Y", "alice");
        let a = storyline_key(&request, Classification::Announcement);
        let b = storyline_key(&request, Classification::Character);
        let c = storyline_key(
            &request.clone().with_thread_context("earlier post"),
            Classification::Announcement,
        );

        assert!(a.starts_with("storyline:"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, storyline_key(&request, Classification::Announcement));
    }

    #[tokio::test]
    async fn test_stats_sum_over_artifact_types() {
        let cache = ArtifactCache::default();
        cache
            .storylines
            .set("storyline:1", Storyline::new("t", "n", "x", "v", vec![]))
            .await;
        cache.thumbnails.set("thumbnail:1", "url".to_string()).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 2);

        cache.clear().await;
        assert_eq!(cache.stats().await.total, 0);
    }
}
