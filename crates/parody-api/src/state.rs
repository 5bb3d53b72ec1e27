//! Application state.

use std::sync::Arc;

use parody_genai::{
    BackoffPolicy, GenAiResult, GeminiTextModel, GenerationClient, HttpMediaBackend,
};
use parody_pipeline::{ArtifactCache, BatchOrchestrator, Orchestrator, PipelineConfig};

use crate::config::ApiConfig;
use crate::middleware::IpRateLimiter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
    pub batch: BatchOrchestrator,
    pub cache: Arc<ArtifactCache>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    /// Build state around an existing generation client.
    pub fn new(config: ApiConfig, client: GenerationClient, pipeline: &PipelineConfig) -> Self {
        let cache = Arc::new(ArtifactCache::new(pipeline));
        let orchestrator = Orchestrator::new(client, Arc::clone(&cache));
        let rate_limiter = Arc::new(IpRateLimiter::new(
            config.rate_limit_rps,
            config.rate_limit_burst,
        ));

        Self {
            batch: BatchOrchestrator::new(orchestrator.clone()),
            orchestrator,
            cache,
            rate_limiter,
            config,
        }
    }

    /// Build state with the remote clients configured from the environment.
    pub fn from_env(config: ApiConfig) -> GenAiResult<Self> {
        let text = GeminiTextModel::from_env()?;
        let media = HttpMediaBackend::from_env()?;
        let client = GenerationClient::new(
            Arc::new(text),
            Arc::new(media),
            BackoffPolicy::from_env(),
        );

        Ok(Self::new(config, client, &PipelineConfig::from_env()))
    }
}
