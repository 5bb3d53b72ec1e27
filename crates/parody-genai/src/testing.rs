//! In-process fakes of the remote capabilities.
//!
//! Enabled with the `testing` feature so downstream crates can drive the
//! real parsing, polling and orchestration logic without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use parody_models::{MediaJob, MediaKind, MediaOutput};

use crate::error::{GenAiError, GenAiResult};
use crate::media::{MediaBackend, MediaRequest};
use crate::poller::PollStatus;
use crate::text::{CompletionRequest, TextModel};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Default storyline reply of [`FakeTextModel`].
pub const FAKE_STORYLINE_JSON: &str = r#"{"title":"Feature Y Has Arrived","narration_script":"In a world desperate for change, one company dared to ship feature Y. Nothing will ever be the same again.","narrator_id":"launch_announcer","visual_prompt":"A glowing keynote stage with a giant feature Y logo","scenes":["A dark stage","A glowing logo rises"]}"#;

/// Call counts of a [`FakeTextModel`], readable after the fake is moved.
#[derive(Debug, Clone, Default)]
pub struct TextCounters {
    classify: Arc<AtomicUsize>,
    storyline: Arc<AtomicUsize>,
}

impl TextCounters {
    pub fn classify_calls(&self) -> usize {
        self.classify.load(Ordering::SeqCst)
    }

    pub fn storyline_calls(&self) -> usize {
        self.storyline.load(Ordering::SeqCst)
    }
}

/// Text model answering by request label.
pub struct FakeTextModel {
    classification: Result<String, String>,
    storyline: Result<String, String>,
    storyline_fail_marker: Option<String>,
    counters: TextCounters,
}

impl Default for FakeTextModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTextModel {
    pub fn new() -> Self {
        Self {
            classification: Ok("announcement".to_string()),
            storyline: Ok(FAKE_STORYLINE_JSON.to_string()),
            storyline_fail_marker: None,
            counters: TextCounters::default(),
        }
    }

    pub fn with_classification(mut self, reply: impl Into<String>) -> Self {
        self.classification = Ok(reply.into());
        self
    }

    pub fn failing_classification(mut self, error: impl Into<String>) -> Self {
        self.classification = Err(error.into());
        self
    }

    pub fn with_storyline(mut self, reply: impl Into<String>) -> Self {
        self.storyline = Ok(reply.into());
        self
    }

    pub fn failing_storyline(mut self, error: impl Into<String>) -> Self {
        self.storyline = Err(error.into());
        self
    }

    /// Fail only storyline prompts that contain `marker`.
    pub fn failing_storylines_containing(mut self, marker: impl Into<String>) -> Self {
        self.storyline_fail_marker = Some(marker.into());
        self
    }

    pub fn counters(&self) -> TextCounters {
        self.counters.clone()
    }
}

#[async_trait]
impl TextModel for FakeTextModel {
    async fn complete(&self, request: &CompletionRequest) -> GenAiResult<String> {
        let reply = match request.label {
            "classify" => {
                self.counters.classify.fetch_add(1, Ordering::SeqCst);
                &self.classification
            }
            "storyline" => {
                self.counters.storyline.fetch_add(1, Ordering::SeqCst);
                if let Some(marker) = &self.storyline_fail_marker {
                    if request.prompt.contains(marker.as_str()) {
                        return Err(GenAiError::request_failed(format!(
                            "storyline rejected: {}",
                            marker
                        )));
                    }
                }
                &self.storyline
            }
            other => return Err(GenAiError::request_failed(format!("unexpected label {}", other))),
        };

        reply.clone().map_err(GenAiError::request_failed)
    }
}

/// Call counts of a [`FakeMediaBackend`], readable after the fake is moved.
#[derive(Debug, Clone, Default)]
pub struct MediaCounters {
    submits: Arc<AtomicUsize>,
    polls: Arc<AtomicUsize>,
    images: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<MediaRequest>>>,
}

impl MediaCounters {
    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn images(&self) -> usize {
        self.images.load(Ordering::SeqCst)
    }

    /// Kinds of every submitted job, in submission order.
    pub fn submitted_kinds(&self) -> Vec<MediaKind> {
        lock(&self.requests).iter().map(|r| r.kind).collect()
    }

    pub fn submitted_requests(&self) -> Vec<MediaRequest> {
        lock(&self.requests).clone()
    }
}

/// Media backend with scripted poll results.
///
/// Status checks pop from the scripted queue; once it is empty every job
/// completes immediately with a clip as long as the requested duration
/// (or `clip_duration`, when set).
pub struct FakeMediaBackend {
    statuses: Mutex<VecDeque<GenAiResult<PollStatus>>>,
    submit_error: Option<String>,
    image: Result<String, String>,
    clip_duration: Option<f64>,
    counters: MediaCounters,
}

impl Default for FakeMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMediaBackend {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            submit_error: None,
            image: Ok("https://fake.media/thumbnail.png".to_string()),
            clip_duration: None,
            counters: MediaCounters::default(),
        }
    }

    pub fn with_statuses(self, statuses: Vec<GenAiResult<PollStatus>>) -> Self {
        *lock(&self.statuses) = statuses.into();
        self
    }

    pub fn failing_submit(mut self, error: impl Into<String>) -> Self {
        self.submit_error = Some(error.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Ok(url.into());
        self
    }

    pub fn failing_image(mut self, error: impl Into<String>) -> Self {
        self.image = Err(error.into());
        self
    }

    /// Report this clip length for default completions.
    pub fn with_clip_duration(mut self, seconds: f64) -> Self {
        self.clip_duration = Some(seconds);
        self
    }

    pub fn counters(&self) -> MediaCounters {
        self.counters.clone()
    }
}

#[async_trait]
impl MediaBackend for FakeMediaBackend {
    async fn submit(&self, request: &MediaRequest) -> GenAiResult<MediaJob> {
        let n = self.counters.submits.fetch_add(1, Ordering::SeqCst);
        lock(&self.counters.requests).push(request.clone());

        if let Some(error) = &self.submit_error {
            return Err(GenAiError::request_failed(error.clone()));
        }

        Ok(MediaJob::new(
            format!("fake-{}-{}-{}", request.kind, request.duration_secs, n),
            request.kind,
        ))
    }

    async fn check_status(&self, job: &MediaJob) -> GenAiResult<PollStatus> {
        self.counters.polls.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = lock(&self.statuses).pop_front() {
            return scripted;
        }

        let requested = job
            .job_id
            .split('-')
            .nth(2)
            .and_then(|s| s.parse::<f64>().ok());
        let output = MediaOutput::new(format!("https://fake.media/{}.mp4", job.job_id));

        Ok(PollStatus::Completed(
            match self.clip_duration.or(requested) {
                Some(duration) => output.with_duration(duration),
                None => output,
            },
        ))
    }

    async fn generate_image(&self, _prompt: &str) -> GenAiResult<String> {
        self.counters.images.fetch_add(1, Ordering::SeqCst);
        self.image.clone().map_err(GenAiError::request_failed)
    }
}
