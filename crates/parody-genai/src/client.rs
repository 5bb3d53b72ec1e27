//! Generation client: classification, storylines and media.
//!
//! Composes the two transports. It does not swallow hard failures on its
//! own except where the operation's contract says so:
//! - `classify` maps unrecognized output to the fallback category but
//!   propagates remote errors; the orchestrator decides to default
//! - `generate_storyline` substitutes a templated storyline when the
//!   response is unparseable, but propagates remote errors
//! - `generate_thumbnail` never fails; it returns `None` instead

use std::sync::Arc;

use parody_models::{Classification, MediaOutput, Storyline};
use tracing::{debug, info, warn};

use crate::error::GenAiResult;
use crate::media::{MediaBackend, MediaRequest};
use crate::poller::{poll_until_complete, BackoffPolicy};
use crate::storyline::{parse_storyline, StorylineParse};
use crate::templates::{
    classification_prompt, enhance_video_prompt, storyline_prompt, thumbnail_prompt,
    PersonaSelector, ANNOUNCER_ID,
};
use crate::text::{CompletionRequest, TextModel};

/// Client for every remote generation capability used by the pipeline.
#[derive(Clone)]
pub struct GenerationClient {
    text: Arc<dyn TextModel>,
    media: Arc<dyn MediaBackend>,
    poll_policy: BackoffPolicy,
    personas: Arc<PersonaSelector>,
}

impl GenerationClient {
    pub fn new(
        text: Arc<dyn TextModel>,
        media: Arc<dyn MediaBackend>,
        poll_policy: BackoffPolicy,
    ) -> Self {
        Self {
            text,
            media,
            poll_policy,
            personas: Arc::new(PersonaSelector::from_entropy()),
        }
    }

    /// Replace the persona randomness source.
    pub fn with_personas(mut self, personas: PersonaSelector) -> Self {
        self.personas = Arc::new(personas);
        self
    }

    /// Classify a post.
    ///
    /// Unrecognized or empty model output yields [`Classification::FALLBACK`].
    /// Transport and API errors are returned to the caller.
    pub async fn classify(&self, text: &str) -> GenAiResult<Classification> {
        // No output cap: thinking models spend it before emitting the label
        let request =
            CompletionRequest::new("classify", classification_prompt(text)).with_temperature(0.0);

        let raw = self.text.complete(&request).await?;

        match Classification::parse_label(&raw) {
            Some(classification) => {
                debug!(classification = %classification, "Post classified");
                Ok(classification)
            }
            None => {
                warn!(
                    raw = %raw.trim(),
                    fallback = %Classification::FALLBACK,
                    "Unrecognized classification output, using fallback"
                );
                Ok(Classification::FALLBACK)
            }
        }
    }

    /// Generate the storyline for a classified post.
    pub async fn generate_storyline(
        &self,
        text: &str,
        author: &str,
        context: &str,
        classification: Classification,
    ) -> GenAiResult<StorylineParse> {
        let persona = match classification {
            Classification::Character => Some(self.personas.pick()),
            Classification::Announcement => None,
        };
        let narrator = persona.map(|p| p.id()).unwrap_or(ANNOUNCER_ID);

        let prompt = storyline_prompt(text, author, context, classification, persona);
        let request = CompletionRequest::new("storyline", prompt)
            .json()
            .with_temperature(0.9);

        let response = self.text.complete(&request).await?;
        let parsed = parse_storyline(&response, text, author, classification, narrator);

        if parsed.is_fallback() {
            warn!(
                classification = %classification,
                "Storyline response was not usable JSON, using templated storyline"
            );
        } else {
            debug!(narrator = %parsed.storyline().narrator_id, "Storyline parsed");
        }

        Ok(parsed)
    }

    /// Generate a video from a storyline's visual prompt.
    pub async fn generate_media(
        &self,
        prompt: &str,
        target_duration: u32,
        classification: Classification,
    ) -> GenAiResult<MediaOutput> {
        let request =
            MediaRequest::text_to_video(enhance_video_prompt(prompt, classification), target_duration);
        self.run_job(&request).await
    }

    /// Generate a video seeded by an image.
    pub async fn generate_media_from_image(
        &self,
        prompt: &str,
        image_url: &str,
        target_duration: u32,
        classification: Classification,
    ) -> GenAiResult<MediaOutput> {
        let request = MediaRequest::image_to_video(
            enhance_video_prompt(prompt, classification),
            image_url,
            target_duration,
        );
        self.run_job(&request).await
    }

    /// Edit an existing generated asset.
    pub async fn edit_media(
        &self,
        source_url: &str,
        instruction: &str,
        target_duration: u32,
    ) -> GenAiResult<MediaOutput> {
        let request = MediaRequest::edit(instruction, source_url, target_duration);
        self.run_job(&request).await
    }

    async fn run_job(&self, request: &MediaRequest) -> GenAiResult<MediaOutput> {
        let job = self.media.submit(request).await?;
        info!(
            job_id = %job.job_id,
            kind = %job.kind,
            duration_secs = request.duration_secs,
            "Waiting for media job"
        );

        poll_until_complete(&self.poll_policy, &job, || {
            let media = Arc::clone(&self.media);
            let job = job.clone();
            async move { media.check_status(&job).await }
        })
        .await
    }

    /// Generate a thumbnail image, returning the error on failure.
    pub async fn try_generate_thumbnail(&self, storyline: &Storyline) -> GenAiResult<String> {
        self.media.generate_image(&thumbnail_prompt(storyline)).await
    }

    /// Generate a thumbnail image. Failures are logged and yield `None`.
    pub async fn generate_thumbnail(&self, storyline: &Storyline) -> Option<String> {
        match self.try_generate_thumbnail(storyline).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Thumbnail generation failed, continuing without: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenAiError;
    use crate::poller::PollStatus;
    use crate::testing::{FakeMediaBackend, FakeTextModel};
    use parody_models::MediaKind;
    use std::time::Duration;

    const STORYLINE_JSON: &str = r#"{"title":"T","narration_script":"N","visual_prompt":"V","scenes":["s1"]}"#;

    fn client(text: FakeTextModel, media: FakeMediaBackend) -> GenerationClient {
        let policy = BackoffPolicy::default()
            .with_base_delay(Duration::from_millis(10))
            .with_max_attempts(3);
        GenerationClient::new(Arc::new(text), Arc::new(media), policy)
            .with_personas(PersonaSelector::seeded(3))
    }

    #[tokio::test]
    async fn test_classify_normalizes_output() {
        let text = FakeTextModel::new().with_classification("  Announcement\n");
        let client = client(text, FakeMediaBackend::new());
        assert_eq!(
            client.classify("we shipped").await.unwrap(),
            Classification::Announcement
        );
    }

    #[tokio::test]
    async fn test_classify_unrecognized_output_defaults() {
        for raw in ["", "¯\\_(ツ)_/¯", "maybe"] {
            let client = client(
                FakeTextModel::new().with_classification(raw),
                FakeMediaBackend::new(),
            );
            assert_eq!(client.classify("x").await.unwrap(), Classification::FALLBACK);
        }
    }

    #[tokio::test]
    async fn test_classify_propagates_remote_errors() {
        let text = FakeTextModel::new().failing_classification("quota exceeded");
        let client = client(text, FakeMediaBackend::new());
        assert!(client.classify("x").await.is_err());
    }

    #[tokio::test]
    async fn test_storyline_parsed_and_fallback() {
        let client_ok = client(
            FakeTextModel::new().with_storyline(STORYLINE_JSON),
            FakeMediaBackend::new(),
        );
        let parsed = client_ok
            .generate_storyline("t", "a", "", Classification::Announcement)
            .await
            .unwrap();
        assert_eq!(parsed.kind(), "parsed");
        assert_eq!(parsed.storyline().narrator_id, ANNOUNCER_ID);

        let client_bad = client(
            FakeTextModel::new().with_storyline("no json here"),
            FakeMediaBackend::new(),
        );
        let parsed = client_bad
            .generate_storyline("t", "a", "", Classification::Character)
            .await
            .unwrap();
        assert!(parsed.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_media_submits_and_polls() {
        let media = FakeMediaBackend::new().with_statuses(vec![
            Ok(PollStatus::Pending),
            Ok(PollStatus::Completed(
                MediaOutput::new("https://cdn/v.mp4").with_duration(6.0),
            )),
        ]);
        let counters = media.counters();
        let client = client(FakeTextModel::new(), media);

        let output = client
            .generate_media("a cat", 8, Classification::Character)
            .await
            .unwrap();
        assert_eq!(output.url, "https://cdn/v.mp4");
        assert_eq!(counters.submits(), 1);
        assert_eq!(counters.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_failure_surfaces_reason() {
        let media = FakeMediaBackend::new()
            .with_statuses(vec![Ok(PollStatus::Failed("policy violation".to_string()))]);
        let client = client(FakeTextModel::new(), media);

        let err = client
            .generate_media("a cat", 8, Classification::Character)
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::JobFailed { .. }));
        assert!(err.to_string().contains("policy violation"));
    }

    #[tokio::test]
    async fn test_classify_request_has_no_output_cap() {
        use crate::config::GeminiConfig;
        use crate::text::GeminiTextModel;
        use serde_json::{json, Value};
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, Request, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/flash:generateContent"))
            .and(body_partial_json(json!({"generationConfig": {"temperature": 0.0}})))
            .and(|req: &Request| {
                serde_json::from_slice::<Value>(&req.body)
                    .map(|body| body["generationConfig"].get("maxOutputTokens").is_none())
                    .unwrap_or(false)
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Announcement"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = GeminiTextModel::new(GeminiConfig {
            api_key: "k".to_string(),
            base_url: server.uri(),
            models: vec!["flash".to_string()],
            ..Default::default()
        })
        .unwrap();
        let client = GenerationClient::new(
            Arc::new(text),
            Arc::new(FakeMediaBackend::new()),
            BackoffPolicy::default(),
        );

        assert_eq!(
            client.classify("we shipped").await.unwrap(),
            Classification::Announcement
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_media_submits_edit_job_with_source() {
        let media = FakeMediaBackend::new();
        let counters = media.counters();
        let client = client(FakeTextModel::new(), media);

        let output = client
            .edit_media("https://cdn/source.mp4", "make it rain", 6)
            .await
            .unwrap();

        assert!(output.url.starts_with("https://fake.media/fake-edit-6-"));
        assert_eq!(output.duration, Some(6.0));

        let submitted = counters.submitted_requests();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].kind, MediaKind::Edit);
        assert_eq!(submitted[0].prompt, "make it rain");
        assert_eq!(submitted[0].source_url.as_deref(), Some("https://cdn/source.mp4"));
    }

    #[tokio::test]
    async fn test_submit_failure_skips_polling() {
        let media = FakeMediaBackend::new().failing_submit("queue full");
        let counters = media.counters();
        let client = client(FakeTextModel::new(), media);

        let err = client
            .generate_media("a cat", 8, Classification::Character)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("queue full"));
        assert_eq!(counters.submits(), 1);
        assert_eq!(counters.polls(), 0);
    }

    #[tokio::test]
    async fn test_thumbnail_returns_backend_url() {
        let media = FakeMediaBackend::new().with_image("https://cdn/custom.png");
        let client = client(FakeTextModel::new(), media);
        let storyline = Storyline::new("t", "n", "x", "v", vec![]);

        assert_eq!(
            client.generate_thumbnail(&storyline).await.as_deref(),
            Some("https://cdn/custom.png")
        );
    }

    #[tokio::test]
    async fn test_thumbnail_failure_is_none() {
        let media = FakeMediaBackend::new().failing_image("image backend down");
        let client = client(FakeTextModel::new(), media);
        let storyline = Storyline::new("t", "n", "x", "v", vec![]);

        assert!(client.generate_thumbnail(&storyline).await.is_none());
        assert!(client.try_generate_thumbnail(&storyline).await.is_err());
    }
}
