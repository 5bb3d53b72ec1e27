//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parody_pipeline::PipelineError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Hard failure of a generation step; the message is always surfaced.
    #[error("{0}")]
    Generation(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::RateLimited => "rate_limited",
            ApiError::Generation(_) => "generation_failed",
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if err.is_validation() {
            ApiError::Validation(err.to_string())
        } else {
            ApiError::Generation(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parody_genai::GenAiError;
    use parody_models::ModelError;

    #[test]
    fn test_pipeline_errors_map_to_status() {
        let validation: ApiError = PipelineError::from(ModelError::MissingField("author")).into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let too_big: ApiError = PipelineError::BatchTooLarge { size: 6, max: 5 }.into();
        assert_eq!(too_big.status_code(), StatusCode::BAD_REQUEST);

        let video: ApiError =
            PipelineError::Video(GenAiError::job_failed("j1", "policy violation")).into();
        assert_eq!(video.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(video.to_string().contains("policy violation"));
    }
}
