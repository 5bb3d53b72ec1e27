//! Generation pipeline.
//!
//! Sequences classify → storyline → (video ∥ thumbnail) for one post,
//! caching every expensive step, and fans the same pipeline out over small
//! batches.

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod timing;


pub use batch::{BatchOrchestrator, MAX_BATCH_SIZE};
pub use cache::ArtifactCache;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RequestLogger;
pub use orchestrator::{GenerateOptions, Orchestrator, PipelineStage, StorylineOnly};
pub use timing::Timings;
