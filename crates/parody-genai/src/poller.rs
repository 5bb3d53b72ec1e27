//! Backoff poller for asynchronous media jobs.
//!
//! After a job has been submitted, its status is checked repeatedly until it
//! completes, fails, or the attempt budget runs out:
//! - Exponential backoff capped at `max_delay`, plus up to `jitter_ratio`
//!   of extra delay so concurrent jobs do not poll in lockstep
//! - Rate limiting and transport errors keep the loop going
//! - An explicit failure status aborts immediately

use std::future::Future;
use std::time::Duration;

use parody_models::{MediaJob, MediaJobState, MediaOutput};
use rand::Rng;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{GenAiError, GenAiResult};
use crate::metrics::{record_media_job, record_poll_attempt};

/// Backoff schedule and attempt budget for polling.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the second status check.
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Upper bound on the un-jittered delay.
    pub max_delay: Duration,
    /// Extra random delay, as a fraction of the computed delay (0.0 disables).
    pub jitter_ratio: f64,
    /// Status checks before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
            jitter_ratio: 0.2,
            max_attempts: 60,
        }
    }
}

impl BackoffPolicy {
    /// Create policy from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_delay: Duration::from_millis(
                std::env::var("POLL_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            multiplier: std::env::var("POLL_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m: &f64| *m >= 1.0)
                .unwrap_or(defaults.multiplier),
            max_delay: Duration::from_millis(
                std::env::var("POLL_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30_000),
            ),
            jitter_ratio: std::env::var("POLL_JITTER_RATIO")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|r: &f64| (0.0..=1.0).contains(r))
                .unwrap_or(defaults.jitter_ratio),
            max_attempts: std::env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Clamped to `0.0..=1.0`; non-finite values disable jitter.
    pub fn with_jitter_ratio(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = if jitter_ratio.is_finite() {
            jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Un-jittered delay for a given attempt: `min(base * multiplier^attempt, max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exp = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = base_ms * self.multiplier.powi(exp);
        let cap_ms = self.max_delay.as_millis() as f64;

        if !delay_ms.is_finite() || delay_ms >= cap_ms {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        }
    }

    /// Delay for a given attempt with random jitter added on top.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if !self.jitter_ratio.is_finite() || self.jitter_ratio <= 0.0 {
            return delay;
        }

        let factor: f64 = rand::rng().random_range(0.0..=self.jitter_ratio);
        delay + delay.mul_f64(factor)
    }
}

/// Normalized result of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Job finished and produced an asset.
    Completed(MediaOutput),
    /// Job failed permanently; polling stops.
    Failed(String),
    /// No result yet.
    Pending,
    /// The status endpoint asked us to slow down.
    RateLimited,
}

/// Statuses that mean the job will never produce a result.
const FAILED_STATUSES: &[&str] = &["failed", "failure", "error", "cancelled", "canceled"];

/// Normalize a status response body.
///
/// Completed shapes are checked in priority order: `{video: {url}}`, then
/// `{url}`, then `{status: "completed", output: {url}}`. A failure status
/// or a non-empty `error` field yields [`PollStatus::Failed`]. Anything else
/// is still pending.
pub fn normalize_status(body: &Value) -> PollStatus {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_lowercase);

    if let Some(url) = str_at(body, &["video", "url"]) {
        let duration = num_at(body, &["video", "duration"]).or_else(|| num_at(body, &["duration"]));
        return PollStatus::Completed(output(url, duration));
    }

    if let Some(url) = str_at(body, &["url"]) {
        return PollStatus::Completed(output(url, num_at(body, &["duration"])));
    }

    if status.as_deref() == Some("completed") {
        if let Some(url) = str_at(body, &["output", "url"]) {
            let duration = num_at(body, &["output", "duration"]);
            return PollStatus::Completed(output(url, duration));
        }
    }

    if let Some(reason) = error_message(body) {
        return PollStatus::Failed(reason);
    }

    if let Some(status) = status {
        if FAILED_STATUSES.contains(&status.as_str()) {
            return PollStatus::Failed(format!("job reported status '{}'", status));
        }
    }

    PollStatus::Pending
}

fn output(url: &str, duration: Option<f64>) -> MediaOutput {
    MediaOutput {
        url: url.to_string(),
        duration,
    }
}

fn value_at<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(body, |v, key| v.get(key))
}

fn str_at<'a>(body: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(body, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn num_at(body: &Value, path: &[&str]) -> Option<f64> {
    let value = value_at(body, path)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().trim_end_matches('s').parse().ok()))
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(obj.clone()).to_string())),
        _ => None,
    }
}

/// Poll a submitted job until it reaches a terminal state.
///
/// `check` performs one status request. Errors it returns are treated as
/// transient and retried; only [`PollStatus::Failed`] or running out of
/// attempts ends the loop early with an error.
pub async fn poll_until_complete<F, Fut>(
    policy: &BackoffPolicy,
    job: &MediaJob,
    mut check: F,
) -> GenAiResult<MediaOutput>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GenAiResult<PollStatus>>,
{
    let started = Instant::now();
    let kind = job.kind.as_str();
    let mut state = MediaJobState::Submitted;

    for attempt in 0..policy.max_attempts {
        record_poll_attempt(kind);
        if state == MediaJobState::Submitted {
            state = MediaJobState::Polling;
        }

        let mut extra_delay = Duration::ZERO;

        match check().await {
            Ok(PollStatus::Completed(output)) => {
                state = MediaJobState::Completed;
                info!(
                    job_id = %job.job_id,
                    kind = %kind,
                    attempts = attempt + 1,
                    state = state.as_str(),
                    "Media job completed"
                );
                record_media_job(kind, state.as_str(), started.elapsed().as_secs_f64());
                return Ok(output);
            }
            Ok(PollStatus::Failed(reason)) => {
                state = MediaJobState::Failed;
                warn!(
                    job_id = %job.job_id,
                    kind = %kind,
                    attempt = attempt + 1,
                    state = state.as_str(),
                    "Media job failed: {}",
                    reason
                );
                record_media_job(kind, state.as_str(), started.elapsed().as_secs_f64());
                return Err(GenAiError::job_failed(&job.job_id, reason));
            }
            Ok(PollStatus::Pending) => {
                debug!(job_id = %job.job_id, attempt = attempt + 1, "Media job still pending");
            }
            Ok(PollStatus::RateLimited) => {
                debug!(job_id = %job.job_id, attempt = attempt + 1, "Status check rate limited");
                extra_delay = policy.base_delay;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    extra_delay = policy.base_delay;
                }
                warn!(
                    job_id = %job.job_id,
                    attempt = attempt + 1,
                    "Status check failed, will retry: {}",
                    e
                );
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.jittered_delay(attempt) + extra_delay;
            debug!(
                job_id = %job.job_id,
                state = state.as_str(),
                delay_ms = delay.as_millis() as u64,
                "Waiting before next status check"
            );
            tokio::time::sleep(delay).await;
        }
    }

    state = MediaJobState::TimedOut;
    warn!(
        job_id = %job.job_id,
        kind = %kind,
        attempts = policy.max_attempts,
        state = state.as_str(),
        "Media job did not finish within the attempt budget"
    );
    record_media_job(kind, state.as_str(), started.elapsed().as_secs_f64());

    Err(GenAiError::Timeout {
        job_id: job.job_id.clone(),
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parody_models::MediaKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy::default()
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(50))
            .with_max_attempts(5)
    }

    #[test]
    fn test_delay_schedule_without_jitter() {
        let policy = BackoffPolicy::default()
            .with_base_delay(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(30_000))
            .with_multiplier(2.0)
            .with_jitter_ratio(0.0);

        let delays: Vec<u64> = (0..=6)
            .map(|a| policy.delay_for_attempt(a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        let policy = BackoffPolicy::default().with_jitter_ratio(0.2);
        for attempt in 0..8 {
            let base = policy.delay_for_attempt(attempt);
            let jittered = policy.jittered_delay(attempt);
            assert!(jittered >= base);
            assert!(jittered <= base + base.mul_f64(0.2) + Duration::from_millis(1));
        }
    }

    #[test]
    fn test_non_finite_jitter_ratio_disables_jitter() {
        for ratio in [f64::NAN, f64::INFINITY, -0.5] {
            let policy = BackoffPolicy::default().with_jitter_ratio(ratio);
            assert_eq!(policy.jitter_ratio, 0.0);
            assert_eq!(policy.jittered_delay(2), policy.delay_for_attempt(2));
        }

        let policy = BackoffPolicy {
            jitter_ratio: f64::NAN,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.jittered_delay(1), policy.delay_for_attempt(1));
        assert_eq!(BackoffPolicy::default().with_jitter_ratio(3.0).jitter_ratio, 1.0);
    }

    #[test]
    fn test_huge_attempt_is_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(10_000), policy.max_delay);
    }

    #[test]
    fn test_normalize_completed_shapes_in_priority_order() {
        let nested = json!({"video": {"url": "https://cdn/v.mp4", "duration": 8.0}, "url": "https://cdn/other"});
        assert_eq!(
            normalize_status(&nested),
            PollStatus::Completed(MediaOutput::new("https://cdn/v.mp4").with_duration(8.0))
        );

        let flat = json!({"url": "https://cdn/flat.mp4", "duration": "6s"});
        assert_eq!(
            normalize_status(&flat),
            PollStatus::Completed(MediaOutput::new("https://cdn/flat.mp4").with_duration(6.0))
        );

        let output = json!({"status": "COMPLETED", "output": {"url": "https://cdn/out.mp4"}});
        assert_eq!(
            normalize_status(&output),
            PollStatus::Completed(MediaOutput::new("https://cdn/out.mp4"))
        );
    }

    #[test]
    fn test_normalize_failures_and_pending() {
        assert_eq!(
            normalize_status(&json!({"status": "failed", "error": "policy violation"})),
            PollStatus::Failed("policy violation".to_string())
        );
        assert_eq!(
            normalize_status(&json!({"error": {"message": "nsfw"}})),
            PollStatus::Failed("nsfw".to_string())
        );
        assert!(matches!(
            normalize_status(&json!({"status": "cancelled"})),
            PollStatus::Failed(_)
        ));
        assert_eq!(
            normalize_status(&json!({"status": "IN_PROGRESS"})),
            PollStatus::Pending
        );
        assert_eq!(
            normalize_status(&json!({"status": "completed"})),
            PollStatus::Pending
        );
        assert_eq!(normalize_status(&json!({"url": ""})), PollStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status_raises_on_first_poll() {
        let job = MediaJob::new("job-1", MediaKind::TextToVideo);
        let calls = AtomicU32::new(0);

        let result = poll_until_complete(&fast_policy(), &job, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Ok(normalize_status(
                    &json!({"status": "failed", "error": "policy violation"}),
                ))
            }
        })
        .await;

        match result {
            Err(GenAiError::JobFailed { job_id, reason }) => {
                assert_eq!(job_id, "job-1");
                assert_eq!(reason, "policy violation");
            }
            other => panic!("expected JobFailed, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_and_rate_limits_keep_polling() {
        let job = MediaJob::new("job-2", MediaKind::TextToVideo);
        let calls = AtomicU32::new(0);

        let result = poll_until_complete(&fast_policy(), &job, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Err(GenAiError::from_http_status(502, "bad gateway")),
                    1 => Ok(PollStatus::RateLimited),
                    2 => Err(GenAiError::from_http_status(429, "slow down")),
                    3 => Ok(PollStatus::Pending),
                    _ => Ok(PollStatus::Completed(MediaOutput::new("https://cdn/v.mp4"))),
                }
            }
        })
        .await;

        assert_eq!(result.unwrap().url, "https://cdn/v.mp4");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_is_a_timeout() {
        let job = MediaJob::new("job-3", MediaKind::ImageToVideo);
        let calls = AtomicU32::new(0);

        let result = poll_until_complete(&fast_policy(), &job, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStatus::Pending) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
