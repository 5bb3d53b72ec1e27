//! Pipeline outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Classification, RequestId};

/// Final output of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub title: String,
    pub narration_script: String,
    pub video_url: String,
    /// `None` when thumbnail generation failed; never a request failure.
    pub thumbnail_url: Option<String>,
    /// Actual clip length reported by the media backend (seconds)
    pub duration: f64,
    /// Clip length requested from the media backend (seconds)
    pub target_duration: u32,
    pub scenes: Vec<String>,
    pub classification: Classification,
    /// How many seconds short of `target_duration` the clip came out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_shortfall_secs: Option<f64>,
}

/// Named span durations of one request, in milliseconds.
///
/// Serializes as `{ "<span>": ms, ..., "total": ms }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimingReport {
    #[serde(flatten)]
    pub spans: BTreeMap<String, u64>,
    pub total: u64,
}

impl TimingReport {
    pub fn span(&self, name: &str) -> Option<u64> {
        self.spans.get(name).copied()
    }
}

/// Successful generation with observability metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub result: GenerationResult,
    pub timing: TimingReport,
}

/// Outcome of one batch item, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemOutcome {
    Success(Box<GenerationResponse>),
    Failure { error: String, index: usize },
}

impl BatchItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemOutcome::Success(_))
    }
}

/// Aggregated batch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItemOutcome>,
    pub processed: usize,
    pub failed: usize,
}

impl BatchResponse {
    pub fn from_outcomes(results: Vec<BatchItemOutcome>) -> Self {
        let failed = results.iter().filter(|r| !r.is_success()).count();
        Self {
            processed: results.len(),
            failed,
            results,
        }
    }
}
