//! Prompt templates and narrator personas.
//!
//! Announcement posts always get the launch-trailer narrator. Every other
//! post is narrated by one of the character personas, picked by a
//! [`PersonaSelector`] so tests can seed the choice.

use std::sync::Mutex;

use parody_models::{Classification, Storyline};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Narrator used for announcement posts.
pub const ANNOUNCER_ID: &str = "launch_announcer";

/// Character narrators for non-announcement posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    NatureDocumentary,
    SportsCommentator,
    NoirDetective,
    MovieTrailer,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::NatureDocumentary,
        Persona::SportsCommentator,
        Persona::NoirDetective,
        Persona::MovieTrailer,
    ];

    /// Stable narrator id reported on the storyline.
    pub fn id(&self) -> &'static str {
        match self {
            Persona::NatureDocumentary => "nature_documentary",
            Persona::SportsCommentator => "sports_commentator",
            Persona::NoirDetective => "noir_detective",
            Persona::MovieTrailer => "movie_trailer",
        }
    }

    /// Voice instructions inserted into the storyline prompt.
    pub fn style(&self) -> &'static str {
        match self {
            Persona::NatureDocumentary => {
                "a hushed wildlife documentary narrator observing the author as a rare species in its natural habitat"
            }
            Persona::SportsCommentator => {
                "an over-caffeinated play-by-play sports commentator calling the post like the final seconds of a championship"
            }
            Persona::NoirDetective => {
                "a weary 1940s noir detective narrating the post as the case that finally broke him"
            }
            Persona::MovieTrailer => {
                "a booming blockbuster trailer voice announcing the post as the event of the century"
            }
        }
    }
}

/// Source of persona choices. Shared across requests.
pub struct PersonaSelector {
    rng: Mutex<StdRng>,
}

impl PersonaSelector {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selector for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn pick(&self) -> Persona {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Persona::ALL[rng.random_range(0..Persona::ALL.len())]
    }
}

impl Default for PersonaSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Prompt asking for a one-word category.
pub fn classification_prompt(text: &str) -> String {
    format!(
        r#"Classify the following social media post into exactly one category.

- announcement: a product launch, feature release, company news or official update
- character: anything else (opinions, jokes, personal updates, hot takes)

Respond with ONLY the single word "announcement" or "character".

POST:
{}"#,
        text
    )
}

/// Prompt asking for a storyline JSON object.
pub fn storyline_prompt(
    text: &str,
    author: &str,
    context: &str,
    classification: Classification,
    persona: Option<Persona>,
) -> String {
    let (narrator_id, voice) = match (classification, persona) {
        (Classification::Announcement, _) | (Classification::Character, None) => (
            ANNOUNCER_ID,
            "an epic product-launch announcer who treats every minor update as a world-changing keynote reveal",
        ),
        (Classification::Character, Some(persona)) => (persona.id(), persona.style()),
    };

    let mut prompt = format!(
        "You are writing a short satirical video about a social media post by @{}.\n\
         The narrator is {}.\n\nPOST:\n{}\n",
        author, voice, text
    );

    if !context.trim().is_empty() {
        prompt.push_str("\nCONTEXT:\n");
        prompt.push_str(context.trim());
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        r#"
Keep the narration between 12 and 25 words so it can be read aloud in under 10 seconds.
Describe 1 to 3 short visual scenes. Never show real people's faces or logos.

Return ONLY a single JSON object with this schema:
{{
  "title": "Short punchy title",
  "narration_script": "What the narrator says",
  "narrator_id": "{}",
  "visual_prompt": "One-sentence description of the whole video",
  "scenes": ["Scene 1 visual description"]
}}"#,
        narrator_id
    ));

    prompt
}

/// Dress up a storyline's visual prompt for the video model.
pub fn enhance_video_prompt(visual_prompt: &str, classification: Classification) -> String {
    let style = match classification {
        Classification::Announcement => {
            "Cinematic product reveal, dramatic lighting, slow dolly-in, lens flares, keynote stage energy"
        }
        Classification::Character => {
            "Cinematic satirical short, expressive characters, vivid colors, comedic timing"
        }
    };
    format!("{}. {}. No text overlays.", visual_prompt.trim_end_matches('.'), style)
}

/// Prompt for the still thumbnail image.
pub fn thumbnail_prompt(storyline: &Storyline) -> String {
    format!(
        "Eye-catching video thumbnail for \"{}\": {}. Bold composition, high contrast, no text.",
        storyline.title,
        storyline.visual_prompt.trim_end_matches('.')
    )
}

/// Deterministic storyline used when the model's response cannot be parsed.
pub fn fallback_storyline(text: &str, author: &str, classification: Classification) -> Storyline {
    let excerpt: String = text.split_whitespace().take(12).collect::<Vec<_>>().join(" ");

    let (title, narration, narrator_id, visual) = match classification {
        Classification::Announcement => (
            format!("@{} Changes Everything", author),
            format!(
                "In a world that never asked for it, @{} delivers: {}. History will remember this day.",
                author, excerpt
            ),
            ANNOUNCER_ID.to_string(),
            "A spotlight sweeps across a dark keynote stage as a glowing box rises from the floor"
                .to_string(),
        ),
        Classification::Character => (
            format!("The Legend of @{}", author),
            format!(
                "Observe @{} in the wild, sharing wisdom with the world: {}. Truly remarkable.",
                author, excerpt
            ),
            Persona::NatureDocumentary.id().to_string(),
            "A lone figure types on a laptop in a misty forest clearing, watched by curious animals"
                .to_string(),
        ),
    };

    Storyline::new(title, narration, narrator_id, visual, Vec::new())
}
