//! Post classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse content class of a post. Selects the storyline template branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Product launches, feature announcements, company news.
    Announcement,
    /// Everything else: opinions, hot takes, personal posts.
    /// Narrated by one of the character personas.
    #[default]
    Character,
}

impl Classification {
    /// Category used whenever classification fails or is unrecognized.
    pub const FALLBACK: Classification = Classification::Character;

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Announcement => "announcement",
            Classification::Character => "character",
        }
    }

    /// Normalize raw model output into a classification.
    ///
    /// Case and surrounding whitespace/punctuation are ignored. Returns
    /// `None` when the output names neither category.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if normalized.is_empty() {
            return None;
        }

        let first_word = normalized
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .find(|w| !w.is_empty())
            .unwrap_or("");

        match first_word {
            "announcement" | "announce" | "product" | "launch" | "news" => {
                Some(Classification::Announcement)
            }
            "character" | "persona" | "general" | "opinion" => Some(Classification::Character),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_is_case_and_whitespace_insensitive() {
        assert_eq!(
            Classification::parse_label("  ANNOUNCEMENT\n"),
            Some(Classification::Announcement)
        );
        assert_eq!(
            Classification::parse_label("Character."),
            Some(Classification::Character)
        );
        assert_eq!(
            Classification::parse_label("\"announcement\""),
            Some(Classification::Announcement)
        );
    }

    #[test]
    fn test_unparseable_output_has_no_label() {
        assert_eq!(Classification::parse_label(""), None);
        assert_eq!(Classification::parse_label("   "), None);
        assert_eq!(Classification::parse_label("I cannot decide, sorry"), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Classification::Announcement).unwrap();
        assert_eq!(json, "\"announcement\"");
    }
}
