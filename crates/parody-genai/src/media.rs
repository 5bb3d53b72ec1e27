//! Media generation transport: the `MediaBackend` seam and its HTTP adapter.
//!
//! The HTTP adapter talks to a queue-style generation API:
//! - `POST {queue}/{model}` submits a job and returns its request id
//! - `GET {queue}/{app}/requests/{id}/status` reports progress
//! - `GET {queue}/{app}/requests/{id}` returns the finished payload
//!
//! `{app}` is the first two segments of the model path. The submit response
//! usually carries `status_url`/`response_url`; those take precedence.
//! - `POST {sync}/{image_model}` generates an image synchronously

use async_trait::async_trait;
use parody_models::{MediaJob, MediaKind};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::MediaBackendConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::poller::{normalize_status, PollStatus};

/// One asynchronous generation job to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub prompt: String,
    /// Requested clip length in seconds
    pub duration_secs: u32,
    /// Seed image (image-to-video) or asset being edited (edit)
    pub source_url: Option<String>,
}

impl MediaRequest {
    pub fn text_to_video(prompt: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            kind: MediaKind::TextToVideo,
            prompt: prompt.into(),
            duration_secs,
            source_url: None,
        }
    }

    pub fn image_to_video(
        prompt: impl Into<String>,
        image_url: impl Into<String>,
        duration_secs: u32,
    ) -> Self {
        Self {
            kind: MediaKind::ImageToVideo,
            prompt: prompt.into(),
            duration_secs,
            source_url: Some(image_url.into()),
        }
    }

    pub fn edit(
        instruction: impl Into<String>,
        source_url: impl Into<String>,
        duration_secs: u32,
    ) -> Self {
        Self {
            kind: MediaKind::Edit,
            prompt: instruction.into(),
            duration_secs,
            source_url: Some(source_url.into()),
        }
    }
}

/// Remote media generation capabilities.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Submit an asynchronous job.
    async fn submit(&self, request: &MediaRequest) -> GenAiResult<MediaJob>;

    /// Check a submitted job once.
    async fn check_status(&self, job: &MediaJob) -> GenAiResult<PollStatus>;

    /// Generate an image and return its URL.
    async fn generate_image(&self, prompt: &str) -> GenAiResult<String>;
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    duration: String,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ImageBody<'a> {
    prompt: &'a str,
    image_size: &'a str,
    num_images: u32,
}

/// HTTP client for the queue-style media API.
pub struct HttpMediaBackend {
    http: Client,
    config: MediaBackendConfig,
}

impl HttpMediaBackend {
    /// Create a new media client.
    pub fn new(config: MediaBackendConfig) -> GenAiResult<Self> {
        url::Url::parse(&config.queue_base_url)
            .map_err(|e| GenAiError::config(format!("invalid MEDIA_BASE_URL: {}", e)))?;
        url::Url::parse(&config.sync_base_url)
            .map_err(|e| GenAiError::config(format!("invalid MEDIA_SYNC_BASE_URL: {}", e)))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenAiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(MediaBackendConfig::from_env()?)
    }

    fn model_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::TextToVideo => &self.config.video_model,
            MediaKind::ImageToVideo => &self.config.image_to_video_model,
            MediaKind::Edit => &self.config.edit_model,
        }
    }

    fn queue_url(&self, model: &str) -> String {
        format!(
            "{}/{}",
            self.config.queue_base_url.trim_end_matches('/'),
            model
        )
    }

    /// Fallback request root when submit returned no URLs.
    fn request_url(&self, kind: MediaKind, job_id: &str) -> String {
        let model = self.model_for(kind);
        let app: Vec<&str> = model.trim_matches('/').split('/').take(2).collect();
        format!("{}/requests/{}", self.queue_url(&app.join("/")), job_id)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.config.api_key)
    }

    async fn get_json(&self, url: &str) -> GenAiResult<Value> {
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MediaBackend for HttpMediaBackend {
    async fn submit(&self, request: &MediaRequest) -> GenAiResult<MediaJob> {
        let model = self.model_for(request.kind);
        let url = self.queue_url(model);

        let source = request.source_url.as_deref();
        let body = SubmitBody {
            prompt: &request.prompt,
            duration: format!("{}s", request.duration_secs),
            aspect_ratio: &self.config.aspect_ratio,
            image_url: source.filter(|_| request.kind == MediaKind::ImageToVideo),
            video_url: source.filter(|_| request.kind == MediaKind::Edit),
        };

        debug!(kind = %request.kind, model = %model, "Submitting media job");

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(
                status.as_u16(),
                format!("media submit returned {}: {}", status, body),
            ));
        }

        let payload: Value = response.json().await?;
        let job_id = ["request_id", "job_id", "id"]
            .iter()
            .find_map(|k| payload.get(*k).and_then(Value::as_str))
            .ok_or_else(|| GenAiError::invalid_response("media submit returned no job id"))?;

        info!(kind = %request.kind, job_id = %job_id, "Media job submitted");
        let mut job = MediaJob::new(job_id, request.kind);
        if let Some(url) = str_field(&payload, "status_url") {
            job = job.with_status_url(url);
        }
        if let Some(url) = str_field(&payload, "response_url") {
            job = job.with_response_url(url);
        }
        Ok(job)
    }

    async fn check_status(&self, job: &MediaJob) -> GenAiResult<PollStatus> {
        let base = self.request_url(job.kind, &job.job_id);
        let status_url = job
            .status_url
            .clone()
            .unwrap_or_else(|| format!("{}/status", base));

        let response = self
            .http
            .get(&status_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(PollStatus::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(status.as_u16(), body));
        }

        let body: Value = response.json().await?;
        let normalized = normalize_status(&body);

        // Queue APIs report completion on the status endpoint and serve the
        // payload from the request endpoint.
        let reports_completed = body
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("completed"));

        if normalized == PollStatus::Pending && reports_completed {
            let result_url = str_field(&body, "response_url")
                .map(str::to_string)
                .or_else(|| job.response_url.clone())
                .unwrap_or(base);

            let payload = self.get_json(&result_url).await?;
            return match normalize_status(&payload) {
                PollStatus::Pending => Err(GenAiError::invalid_response(
                    "job completed but result has no media url",
                )),
                other => Ok(other),
            };
        }

        Ok(normalized)
    }

    async fn generate_image(&self, prompt: &str) -> GenAiResult<String> {
        let url = format!(
            "{}/{}",
            self.config.sync_base_url.trim_end_matches('/'),
            self.config.image_model
        );

        let body = ImageBody {
            prompt,
            image_size: "landscape_16_9",
            num_images: 1,
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(status.as_u16(), body));
        }

        let payload: Value = response.json().await?;
        image_url(&payload)
            .map(str::to_string)
            .ok_or_else(|| GenAiError::invalid_response("image response has no url"))
    }
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Extract an image URL from `{images: [{url}]}`, `{image: {url}}` or `{url}`.
fn image_url(payload: &Value) -> Option<&str> {
    payload
        .get("images")
        .and_then(|images| images.get(0))
        .and_then(|img| img.get("url"))
        .or_else(|| payload.get("image").and_then(|img| img.get("url")))
        .or_else(|| payload.get("url"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
