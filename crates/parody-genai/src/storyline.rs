//! Best-effort storyline parsing from free-form model output.

use parody_models::{Classification, Storyline};
use serde::Deserialize;

use crate::templates::fallback_storyline;

/// How a storyline was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum StorylineParse {
    /// Parsed from the model response.
    Parsed(Storyline),
    /// The response was unusable; a templated storyline was substituted.
    Fallback(Storyline),
}

impl StorylineParse {
    pub fn storyline(&self) -> &Storyline {
        match self {
            StorylineParse::Parsed(s) | StorylineParse::Fallback(s) => s,
        }
    }

    pub fn into_inner(self) -> Storyline {
        match self {
            StorylineParse::Parsed(s) | StorylineParse::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StorylineParse::Fallback(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StorylineParse::Parsed(_) => "parsed",
            StorylineParse::Fallback(_) => "fallback",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawStoryline {
    title: String,
    #[serde(alias = "narrationScript", alias = "narration", alias = "script")]
    narration_script: String,
    #[serde(default, alias = "narratorId", alias = "narrator")]
    narrator_id: Option<String>,
    #[serde(alias = "visualPrompt", alias = "video_prompt", alias = "videoPrompt")]
    visual_prompt: String,
    #[serde(default)]
    scenes: Vec<String>,
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Locate the first balanced `{...}` span, ignoring braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a storyline out of a model response, or substitute the templated one.
pub fn parse_storyline(
    response: &str,
    text: &str,
    author: &str,
    classification: Classification,
    default_narrator: &str,
) -> StorylineParse {
    match try_parse(response, default_narrator) {
        Some(storyline) => StorylineParse::Parsed(storyline),
        None => StorylineParse::Fallback(fallback_storyline(text, author, classification)),
    }
}

fn try_parse(response: &str, default_narrator: &str) -> Option<Storyline> {
    let json = extract_json_object(strip_code_fences(response))?;
    let raw: RawStoryline = serde_json::from_str(json).ok()?;

    if raw.title.trim().is_empty()
        || raw.narration_script.trim().is_empty()
        || raw.visual_prompt.trim().is_empty()
    {
        return None;
    }

    let narrator_id = raw
        .narrator_id
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default_narrator.to_string());

    Some(Storyline::new(
        raw.title.trim(),
        raw.narration_script.trim(),
        narrator_id,
        raw.visual_prompt.trim(),
        raw.scenes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"title":"Dark Mode Rises","narration_script":"Behold, darkness.","narrator_id":"launch_announcer","visual_prompt":"A sun sets over a laptop","scenes":["sunset","laptop"]}"#;

    #[test]
    fn test_extracts_object_surrounded_by_prose() {
        let response = format!("Sure! Here is your storyline:\n{}\nHope it helps {{:", VALID);
        assert_eq!(extract_json_object(&response), Some(VALID));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"x {"a": "close } and \" quote {", "b": {"c": 1}} trailing }"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": "close } and \" quote {", "b": {"c": 1}}"#)
        );
        assert_eq!(extract_json_object("{ unbalanced"), None);
        assert_eq!(extract_json_object("no json"), None);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }

    #[test]
    fn test_parse_valid_response() {
        let response = format!("```json\n{}\n```", VALID);
        let parsed = parse_storyline(&response, "t", "a", Classification::Announcement, "x");
        assert!(!parsed.is_fallback());
        let storyline = parsed.into_inner();
        assert_eq!(storyline.title, "Dark Mode Rises");
        assert_eq!(storyline.scenes.len(), 2);
    }

    #[test]
    fn test_camel_case_and_missing_scenes() {
        let response = r#"{"title":"T","narrationScript":"N","visualPrompt":"V"}"#;
        let parsed = parse_storyline(response, "t", "a", Classification::Character, "noir_detective");
        let storyline = parsed.storyline();
        assert_eq!(storyline.narrator_id, "noir_detective");
        assert_eq!(storyline.scenes, vec!["V".to_string()]);
    }

    #[test]
    fn test_unusable_responses_fall_back() {
        for response in [
            "I can't help with that.",
            "{\"title\": \"only a title\"}",
            "{\"title\":\"\",\"narration_script\":\"n\",\"visual_prompt\":\"v\"}",
            "",
        ] {
            let parsed =
                parse_storyline(response, "Company X ships Y", "alice", Classification::Announcement, "x");
            assert!(parsed.is_fallback(), "expected fallback for {:?}", response);
            assert_eq!(parsed.kind(), "fallback");
            assert!(!parsed.storyline().scenes.is_empty());
        }
    }
}
