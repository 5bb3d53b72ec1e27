//! Clients for the remote generation capabilities.
//!
//! This crate provides:
//! - `TextModel`: prompt in, text out (Gemini adapter with model fallback)
//! - `MediaBackend`: asynchronous submit + status poll, and image generation
//! - A backoff poller that waits on long-running media jobs
//! - `GenerationClient`: classification, storyline and media generation
//!   built on top of the two transports

pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod poller;
pub mod storyline;
pub mod templates;
pub mod text;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::GenerationClient;
pub use config::{GeminiConfig, MediaBackendConfig};
pub use error::{GenAiError, GenAiResult};
pub use media::{HttpMediaBackend, MediaBackend, MediaRequest};
pub use poller::{poll_until_complete, BackoffPolicy, PollStatus};
pub use storyline::StorylineParse;
pub use templates::{Persona, PersonaSelector};
pub use text::{CompletionRequest, GeminiTextModel, TextModel};
