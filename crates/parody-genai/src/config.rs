//! Remote API configuration.

use std::time::Duration;

use crate::error::{GenAiError, GenAiResult};

/// Configuration for the Gemini text model.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// API root, without the `/v1beta` segment
    pub base_url: String,
    /// Models tried in order until one succeeds
    pub models: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
                "gemini-2.5-pro".to_string(),
            ],
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let defaults = Self::default();

        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GenAiError::config("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models: std::env::var("GEMINI_MODELS")
                .map(|s| parse_list(&s))
                .ok()
                .filter(|models| !models.is_empty())
                .unwrap_or(defaults.models),
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}

/// Configuration for the asynchronous media generation API.
#[derive(Debug, Clone)]
pub struct MediaBackendConfig {
    pub api_key: String,
    /// Queue API root (submit + status)
    pub queue_base_url: String,
    /// Synchronous API root (image generation)
    pub sync_base_url: String,
    pub video_model: String,
    pub image_to_video_model: String,
    pub edit_model: String,
    pub image_model: String,
    /// Aspect ratio requested for video and thumbnails
    pub aspect_ratio: String,
    /// Per-request timeout (each submit or poll, not the whole job)
    pub timeout: Duration,
}

impl Default for MediaBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            queue_base_url: "https://queue.fal.run".to_string(),
            sync_base_url: "https://fal.run".to_string(),
            video_model: "fal-ai/veo3/fast".to_string(),
            image_to_video_model: "fal-ai/veo3/fast/image-to-video".to_string(),
            edit_model: "fal-ai/wan-vace/video-to-video".to_string(),
            image_model: "fal-ai/flux/schnell".to_string(),
            aspect_ratio: "16:9".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl MediaBackendConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let defaults = Self::default();

        let api_key = std::env::var("MEDIA_API_KEY")
            .map_err(|_| GenAiError::config("MEDIA_API_KEY not set"))?;

        Ok(Self {
            api_key,
            queue_base_url: std::env::var("MEDIA_BASE_URL").unwrap_or(defaults.queue_base_url),
            sync_base_url: std::env::var("MEDIA_SYNC_BASE_URL")
                .unwrap_or(defaults.sync_base_url),
            video_model: std::env::var("MEDIA_VIDEO_MODEL").unwrap_or(defaults.video_model),
            image_to_video_model: std::env::var("MEDIA_IMAGE_TO_VIDEO_MODEL")
                .unwrap_or(defaults.image_to_video_model),
            edit_model: std::env::var("MEDIA_EDIT_MODEL").unwrap_or(defaults.edit_model),
            image_model: std::env::var("MEDIA_IMAGE_MODEL").unwrap_or(defaults.image_model),
            aspect_ratio: std::env::var("MEDIA_ASPECT_RATIO").unwrap_or(defaults.aspect_ratio),
            timeout: Duration::from_secs(
                std::env::var("MEDIA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(
            parse_list(" gemini-2.5-flash, ,gemini-2.5-pro "),
            vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let gemini = GeminiConfig::default();
        assert_eq!(gemini.models.len(), 3);
        assert_eq!(gemini.timeout, Duration::from_secs(60));

        let media = MediaBackendConfig::default();
        assert_eq!(media.aspect_ratio, "16:9");
    }
}
