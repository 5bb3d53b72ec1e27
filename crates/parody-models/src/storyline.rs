//! Storyline: the generated script bundle that drives media generation.

use serde::{Deserialize, Serialize};

/// Narration words per second used to size the target clip duration.
const WORDS_PER_SECOND: f64 = 2.5;

/// Shortest clip the media backend is asked for (seconds).
pub const MIN_TARGET_DURATION: u32 = 5;

/// Longest clip the media backend is asked for (seconds).
pub const MAX_TARGET_DURATION: u32 = 10;

/// Generated script, title and visual prompts for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storyline {
    pub title: String,
    pub narration_script: String,
    pub narrator_id: String,
    pub visual_prompt: String,
    /// Never empty; see [`Storyline::ensure_scenes`].
    #[serde(default)]
    pub scenes: Vec<String>,
}

impl Storyline {
    /// Build a storyline, synthesizing `scenes` from the visual prompt if needed.
    pub fn new(
        title: impl Into<String>,
        narration_script: impl Into<String>,
        narrator_id: impl Into<String>,
        visual_prompt: impl Into<String>,
        scenes: Vec<String>,
    ) -> Self {
        let mut storyline = Self {
            title: title.into(),
            narration_script: narration_script.into(),
            narrator_id: narrator_id.into(),
            visual_prompt: visual_prompt.into(),
            scenes,
        };
        storyline.ensure_scenes();
        storyline
    }

    /// Drop blank scene prompts and fall back to `[visual_prompt]` when none remain.
    pub fn ensure_scenes(&mut self) {
        self.scenes.retain(|s| !s.trim().is_empty());
        if self.scenes.is_empty() {
            self.scenes.push(self.visual_prompt.clone());
        }
    }

    /// Clip length (seconds) needed to read the narration aloud.
    pub fn target_duration(&self) -> u32 {
        let words = self.narration_script.split_whitespace().count() as f64;
        let seconds = (words / WORDS_PER_SECOND).ceil() as u32;
        seconds.clamp(MIN_TARGET_DURATION, MAX_TARGET_DURATION)
    }
}
