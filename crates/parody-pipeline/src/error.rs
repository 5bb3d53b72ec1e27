//! Pipeline error types.

use parody_genai::GenAiError;
use parody_models::ModelError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ModelError),

    #[error("Batch of {size} items exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Batch must contain at least one item")]
    EmptyBatch,

    #[error("Storyline generation failed: {0}")]
    Storyline(#[source] GenAiError),

    #[error("Video generation failed: {0}")]
    Video(#[source] GenAiError),
}

impl PipelineError {
    /// Rejected before any remote call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::BatchTooLarge { .. }
                | PipelineError::EmptyBatch
        )
    }

    /// Pipeline step that failed, for logs and error payloads.
    pub fn step(&self) -> &'static str {
        match self {
            PipelineError::Validation(_)
            | PipelineError::BatchTooLarge { .. }
            | PipelineError::EmptyBatch => "validation",
            PipelineError::Storyline(_) => "storyline",
            PipelineError::Video(_) => "video",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            PipelineError::Storyline(e) | PipelineError::Video(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_error_surfaces_underlying_message() {
        let err = PipelineError::Video(GenAiError::job_failed("j1", "policy violation"));
        assert_eq!(
            err.to_string(),
            "Video generation failed: Media job j1 failed: policy violation"
        );
        assert_eq!(err.step(), "video");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_errors() {
        let err: PipelineError = ModelError::MissingField("author").into();
        assert!(err.is_validation());
        assert!(PipelineError::BatchTooLarge { size: 6, max: 5 }.is_validation());
    }

    #[test]
    fn test_timeout_detected_through_step_errors() {
        let timeout = GenAiError::Timeout {
            job_id: "j1".to_string(),
            attempts: 60,
        };
        assert!(PipelineError::Video(timeout).is_timeout());
        assert!(!PipelineError::Video(GenAiError::job_failed("j1", "nope")).is_timeout());
        assert!(!PipelineError::EmptyBatch.is_timeout());
    }
}
