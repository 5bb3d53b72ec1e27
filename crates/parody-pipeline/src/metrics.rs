//! Pipeline metrics.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Duration of each pipeline step.
    pub const STEP_DURATION_SECONDS: &str = "parody_step_duration_seconds";

    /// Finished generation requests by outcome.
    pub const GENERATIONS_TOTAL: &str = "parody_generations_total";

    /// Soft failures replaced by a default, by step.
    pub const FALLBACKS_TOTAL: &str = "parody_fallbacks_total";

    /// Items per accepted batch.
    pub const BATCH_ITEMS: &str = "parody_batch_items";
}

pub fn record_step(step: &str, elapsed: Duration) {
    histogram!(names::STEP_DURATION_SECONDS, "step" => step.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_generation(outcome: &str) {
    counter!(names::GENERATIONS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_fallback(step: &str) {
    counter!(names::FALLBACKS_TOTAL, "step" => step.to_string()).increment(1);
}

pub fn record_batch(items: usize) {
    histogram!(names::BATCH_ITEMS).record(items as f64);
}
