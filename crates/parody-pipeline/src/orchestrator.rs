//! Generation orchestrator.
//!
//! Per request: `received → classifying → storyline_pending → media_pending
//! → completed | failed`.
//!
//! - classify is best-effort and defaults to [`Classification::FALLBACK`]
//! - the storyline is mandatory and cached
//! - video and thumbnail run concurrently, each cached on its own key;
//!   video is mandatory and thumbnail is optional
//! - cohesive mode generates the thumbnail first and seeds the video with it,
//!   falling back to the standard video path

use std::sync::Arc;

use parody_cache::metrics::{record_hit, record_miss};
use parody_genai::templates::thumbnail_prompt;
use parody_genai::{GenAiResult, GenerationClient};
use parody_models::{
    Classification, GenerationRequest, GenerationResponse, GenerationResult, MediaOutput,
    RequestId, Storyline, TimingReport,
};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, Instrument};

use crate::cache::{storyline_key, thumbnail_key, video_key, ArtifactCache};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RequestLogger;
use crate::metrics::{record_fallback, record_generation};
use crate::timing::Timings;

/// Per-call switches.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Seed the video with the generated thumbnail.
    pub cohesive: bool,
    /// Id to log and return; a new one is generated when absent.
    pub request_id: Option<RequestId>,
}

impl GenerateOptions {
    pub fn cohesive() -> Self {
        Self {
            cohesive: true,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Request lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Classifying,
    StorylinePending,
    MediaPending,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Classifying => "classifying",
            PipelineStage::StorylinePending => "storyline_pending",
            PipelineStage::MediaPending => "media_pending",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        }
    }
}

/// Output of the storyline-only path.
#[derive(Debug, Clone, Serialize)]
pub struct StorylineOnly {
    pub request_id: RequestId,
    pub classification: Classification,
    pub storyline: Storyline,
    /// "parsed" or "fallback"
    pub parse: &'static str,
    pub timing: TimingReport,
}

/// Runs the generation pipeline for one request.
#[derive(Clone)]
pub struct Orchestrator {
    client: GenerationClient,
    cache: Arc<ArtifactCache>,
}

impl Orchestrator {
    pub fn new(client: GenerationClient, cache: Arc<ArtifactCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    /// Run the full pipeline.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: GenerateOptions,
    ) -> PipelineResult<GenerationResponse> {
        let request_id = options.request_id.clone().unwrap_or_default();
        let logger = RequestLogger::new(&request_id, "generate");
        let span = logger.create_span();

        let result = self
            .run(request, request_id, options.cohesive, &logger)
            .instrument(span)
            .await;

        match &result {
            Ok(_) => record_generation("success"),
            Err(e) => {
                transition(&logger, PipelineStage::Failed);
                logger.log_error(e.step(), &e.to_string());
                let outcome = if e.is_validation() {
                    "rejected"
                } else if e.is_timeout() {
                    "timeout"
                } else {
                    "failed"
                };
                record_generation(outcome);
            }
        }

        result
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        request_id: RequestId,
        cohesive: bool,
        logger: &RequestLogger,
    ) -> PipelineResult<GenerationResponse> {
        transition(logger, PipelineStage::Received);
        request.validate()?;

        let mut timings = Timings::start();
        logger.log_start(&format!("@{} cohesive={}", request.author, cohesive));

        transition(logger, PipelineStage::Classifying);
        let classification = timings
            .measure("classify", self.classify(&request.text, logger))
            .await;

        transition(logger, PipelineStage::StorylinePending);
        let storyline = timings
            .measure("storyline", self.cached_storyline(request, classification, logger))
            .await
            .map_err(PipelineError::Storyline)?;

        transition(logger, PipelineStage::MediaPending);
        let target_duration = storyline.target_duration();
        let media_started = Instant::now();

        let (video, thumbnail_url) = if cohesive {
            self.cohesive_media(&storyline, classification, target_duration, logger)
                .await
        } else {
            let (video, thumbnail) = tokio::join!(
                self.cached_video(&storyline, classification, target_duration, None),
                self.cached_thumbnail(&storyline),
            );
            let thumbnail_url = match thumbnail {
                Ok(url) => Some(url),
                Err(e) => {
                    logger.log_fallback("thumbnail", &format!("continuing without thumbnail: {}", e));
                    record_fallback("thumbnail");
                    None
                }
            };
            (video, thumbnail_url)
        };
        timings.record("media", media_started.elapsed());

        let video = video.map_err(PipelineError::Video)?;

        let duration = video.duration.unwrap_or(target_duration as f64);
        let duration_shortfall_secs =
            (duration < target_duration as f64).then(|| target_duration as f64 - duration);
        if let Some(shortfall) = duration_shortfall_secs {
            logger.log_warning(
                "media",
                &format!(
                    "clip is {:.1}s shorter than the {}s target",
                    shortfall, target_duration
                ),
            );
        }

        transition(logger, PipelineStage::Completed);
        let timing = timings.report();
        logger.log_completion(timing.total);

        Ok(GenerationResponse {
            request_id,
            result: GenerationResult {
                title: storyline.title,
                narration_script: storyline.narration_script,
                video_url: video.url,
                thumbnail_url,
                duration,
                target_duration,
                scenes: storyline.scenes,
                classification,
                duration_shortfall_secs,
            },
            timing,
        })
    }

    /// Classify and generate a storyline without caching or media.
    pub async fn storyline_only(
        &self,
        request: &GenerationRequest,
        request_id: Option<RequestId>,
    ) -> PipelineResult<StorylineOnly> {
        let request_id = request_id.unwrap_or_default();
        let logger = RequestLogger::new(&request_id, "storyline_only");

        let result = self
            .run_storyline_only(request, request_id, &logger)
            .instrument(logger.create_span())
            .await;

        if let Err(e) = &result {
            logger.log_error(e.step(), &e.to_string());
        }
        result
    }

    async fn run_storyline_only(
        &self,
        request: &GenerationRequest,
        request_id: RequestId,
        logger: &RequestLogger,
    ) -> PipelineResult<StorylineOnly> {
        request.validate()?;
        let mut timings = Timings::start();

        let classification = timings
            .measure("classify", self.classify(&request.text, logger))
            .await;

        let context = request.context_summary();
        let parsed = timings
            .measure(
                "storyline",
                self.client.generate_storyline(
                    &request.text,
                    &request.author,
                    &context,
                    classification,
                ),
            )
            .await
            .map_err(PipelineError::Storyline)?;

        if parsed.is_fallback() {
            logger.log_fallback("storyline", "model response was not usable, using template");
            record_fallback("storyline");
        }

        Ok(StorylineOnly {
            request_id,
            classification,
            parse: parsed.kind(),
            storyline: parsed.into_inner(),
            timing: timings.report(),
        })
    }

    /// Best-effort classification.
    async fn classify(&self, text: &str, logger: &RequestLogger) -> Classification {
        match self.client.classify(text).await {
            Ok(classification) => {
                logger.log_step("classify", &format!("classified as {}", classification));
                classification
            }
            Err(e) => {
                logger.log_fallback(
                    "classify",
                    &format!(
                        "classification failed, using {}: {}",
                        Classification::FALLBACK,
                        e
                    ),
                );
                record_fallback("classify");
                Classification::FALLBACK
            }
        }
    }

    async fn cached_storyline(
        &self,
        request: &GenerationRequest,
        classification: Classification,
        logger: &RequestLogger,
    ) -> GenAiResult<Storyline> {
        let key = storyline_key(request, classification);
        if let Some(storyline) = self.cache.storylines.get(&key).await {
            record_hit(&key);
            logger.log_step("storyline", "served from cache");
            return Ok(storyline);
        }
        record_miss(&key);

        let parsed = self
            .client
            .generate_storyline(
                &request.text,
                &request.author,
                &request.context_summary(),
                classification,
            )
            .await?;

        // Templated stand-ins are not cached so the next request retries the model
        if parsed.is_fallback() {
            logger.log_fallback("storyline", "model response was not usable, using template");
            record_fallback("storyline");
            return Ok(parsed.into_inner());
        }

        let storyline = parsed.into_inner();
        self.cache.storylines.set(key, storyline.clone()).await;
        Ok(storyline)
    }

    async fn cached_video(
        &self,
        storyline: &Storyline,
        classification: Classification,
        target_duration: u32,
        seed_image: Option<&str>,
    ) -> GenAiResult<MediaOutput> {
        let prompt = storyline.visual_prompt.as_str();
        let key = video_key(prompt, target_duration, classification, seed_image);
        let client = &self.client;

        self.cache
            .videos
            .get_or_compute(&key, move || async move {
                match seed_image {
                    Some(image_url) => {
                        client
                            .generate_media_from_image(
                                prompt,
                                image_url,
                                target_duration,
                                classification,
                            )
                            .await
                    }
                    None => {
                        client
                            .generate_media(prompt, target_duration, classification)
                            .await
                    }
                }
            })
            .await
    }

    async fn cached_thumbnail(&self, storyline: &Storyline) -> GenAiResult<String> {
        let key = thumbnail_key(&thumbnail_prompt(storyline));
        let client = &self.client;

        self.cache
            .thumbnails
            .get_or_compute(&key, move || client.try_generate_thumbnail(storyline))
            .await
    }

    /// Thumbnail first, then a video seeded with it.
    async fn cohesive_media(
        &self,
        storyline: &Storyline,
        classification: Classification,
        target_duration: u32,
        logger: &RequestLogger,
    ) -> (GenAiResult<MediaOutput>, Option<String>) {
        let thumbnail = match self.cached_thumbnail(storyline).await {
            Ok(url) => url,
            Err(e) => {
                logger.log_fallback(
                    "cohesive",
                    &format!("thumbnail failed, generating video from prompt: {}", e),
                );
                record_fallback("cohesive");
                let video = self
                    .cached_video(storyline, classification, target_duration, None)
                    .await;
                return (video, None);
            }
        };

        let seeded = self
            .cached_video(storyline, classification, target_duration, Some(&thumbnail))
            .await;

        match seeded {
            Ok(video) => (Ok(video), Some(thumbnail)),
            Err(e) => {
                logger.log_fallback(
                    "cohesive",
                    &format!("image-to-video failed, generating video from prompt: {}", e),
                );
                record_fallback("cohesive");
                let video = self
                    .cached_video(storyline, classification, target_duration, None)
                    .await;
                (video, Some(thumbnail))
            }
        }
    }
}

fn transition(logger: &RequestLogger, stage: PipelineStage) {
    debug!(
        request_id = %logger.request_id(),
        stage = stage.as_str(),
        "Pipeline stage"
    );
}
