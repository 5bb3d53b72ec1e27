//! Shared data models for the parody generation backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and their validation
//! - Post classification
//! - Storylines (title, narration, scene prompts)
//! - Asynchronous media jobs and their outputs
//! - Generation results, timing reports and batch outcomes

pub mod classification;
pub mod error;
pub mod media;
pub mod request;
pub mod result;
pub mod storyline;

// Re-export common types
pub use classification::Classification;
pub use error::{ModelError, ModelResult};
pub use media::{MediaJob, MediaJobState, MediaKind, MediaOutput};
pub use request::{GenerationRequest, RequestId};
pub use result::{
    BatchItemOutcome, BatchResponse, GenerationResponse, GenerationResult, TimingReport,
};
pub use storyline::Storyline;
