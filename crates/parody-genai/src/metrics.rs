//! Generation client metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Status checks issued against media jobs.
    pub const MEDIA_POLL_ATTEMPTS_TOTAL: &str = "parody_media_poll_attempts_total";

    /// Finished media jobs by outcome (completed, failed, timed_out).
    pub const MEDIA_JOBS_TOTAL: &str = "parody_media_jobs_total";

    /// Wall time from submission to terminal state.
    pub const MEDIA_JOB_DURATION_SECONDS: &str = "parody_media_job_duration_seconds";

    /// Text model calls by label and model.
    pub const TEXT_REQUESTS_TOTAL: &str = "parody_text_requests_total";
}

pub fn record_poll_attempt(kind: &str) {
    counter!(names::MEDIA_POLL_ATTEMPTS_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_media_job(kind: &str, outcome: &str, duration_secs: f64) {
    counter!(
        names::MEDIA_JOBS_TOTAL,
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(names::MEDIA_JOB_DURATION_SECONDS, "kind" => kind.to_string())
        .record(duration_secs);
}

pub fn record_text_request(label: &str, model: &str, success: bool) {
    counter!(
        names::TEXT_REQUESTS_TOTAL,
        "label" => label.to_string(),
        "model" => model.to_string(),
        "status" => if success { "ok" } else { "error" }
    )
    .increment(1);
}
