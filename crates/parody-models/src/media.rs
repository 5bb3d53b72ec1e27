//! Asynchronous media job definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remote media generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Video from a text prompt
    TextToVideo,
    /// Video seeded by an existing image
    ImageToVideo,
    /// Edit of a previously generated asset
    Edit,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::TextToVideo => "text_to_video",
            MediaKind::ImageToVideo => "image_to_video",
            MediaKind::Edit => "edit",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight asynchronous generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaJob {
    pub job_id: String,
    pub kind: MediaKind,
    pub submitted_at: DateTime<Utc>,
    /// Status endpoint returned by the backend on submit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
    /// Result endpoint returned by the backend on submit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,
}

impl MediaJob {
    pub fn new(job_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            submitted_at: Utc::now(),
            status_url: None,
            response_url: None,
        }
    }

    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = Some(url.into());
        self
    }

    pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = Some(url.into());
        self
    }
}

/// Lifecycle of a media job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaJobState {
    #[default]
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl MediaJobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaJobState::Submitted => "submitted",
            MediaJobState::Polling => "polling",
            MediaJobState::Completed => "completed",
            MediaJobState::Failed => "failed",
            MediaJobState::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MediaJobState::Completed | MediaJobState::Failed | MediaJobState::TimedOut
        )
    }
}

/// Result of a completed media job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaOutput {
    pub url: String,
    /// Clip length in seconds, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl MediaOutput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!MediaJobState::Submitted.is_terminal());
        assert!(!MediaJobState::Polling.is_terminal());
        assert!(MediaJobState::Completed.is_terminal());
        assert!(MediaJobState::Failed.is_terminal());
        assert!(MediaJobState::TimedOut.is_terminal());
    }
}
