//! Generation handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use parody_models::{BatchResponse, GenerationRequest, GenerationResponse, RequestId};
use parody_pipeline::{GenerateOptions, StorylineOnly};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Body of `POST /api/generate` and `/api/generate/storyline-only`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(flatten)]
    pub request: GenerationRequest,
    /// Seed the video with the generated thumbnail.
    #[serde(default)]
    pub cohesive: bool,
}

/// Body of `POST /api/generate/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub items: Vec<GenerationRequest>,
    #[serde(default)]
    pub cohesive: bool,
}

/// Generate a video for one post.
pub async fn generate(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> ApiResult<Json<GenerationResponse>> {
    let Json(body) = body?;

    let mut options = GenerateOptions {
        cohesive: body.cohesive,
        request_id: None,
    };
    if let Some(Extension(id)) = request_id {
        options = options.with_request_id(id);
    }

    let response = state.orchestrator.generate(&body.request, options).await?;
    Ok(Json(response))
}

/// Generate videos for up to five posts concurrently.
pub async fn generate_batch(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<BatchBody>, JsonRejection>,
) -> ApiResult<Json<BatchResponse>> {
    let Json(body) = body?;

    let response = state
        .batch
        .run(&body.items, body.cohesive, request_id.map(|Extension(id)| id))
        .await?;
    Ok(Json(response))
}

/// Classify and write a storyline without generating media.
pub async fn storyline_only(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> ApiResult<Json<StorylineOnly>> {
    let Json(body) = body?;

    let output = state
        .orchestrator
        .storyline_only(&body.request, request_id.map(|Extension(id)| id))
        .await?;
    Ok(Json(output))
}
