//! Generation request definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Unique identifier for one pipeline run. Appears in every log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input to the generation pipeline.
///
/// Accepts both the internal field names and the wire names used by the
/// browser extension (`tweet_text`, `user_bio`, `user_followers`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenerationRequest {
    /// Post text
    #[serde(default, alias = "tweet_text")]
    pub text: String,

    /// Post author handle
    #[serde(default)]
    pub author: String,

    /// Surrounding thread, already flattened to text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_context: Option<String>,

    #[serde(default, alias = "user_bio", skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,

    /// Follower count as displayed (e.g. "12.3K")
    #[serde(default, alias = "user_followers", skip_serializing_if = "Option::is_none")]
    pub author_followers: Option<String>,

    /// Handles this post replies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replying_to: Vec<String>,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_thread_context(mut self, context: impl Into<String>) -> Self {
        self.thread_context = Some(context.into());
        self
    }

    /// Validate the request.
    pub fn validate(&self) -> ModelResult<()> {
        if self.text.trim().is_empty() {
            return Err(ModelError::MissingField("tweet_text"));
        }

        if self.author.trim().is_empty() {
            return Err(ModelError::MissingField("author"));
        }

        Ok(())
    }

    /// Free-form context block handed to the storyline prompt.
    ///
    /// Empty when the request carries no optional context.
    pub fn context_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(bio) = non_blank(&self.author_bio) {
            lines.push(format!("Author bio: {}", bio));
        }
        if let Some(followers) = non_blank(&self.author_followers) {
            lines.push(format!("Author followers: {}", followers));
        }
        if !self.replying_to.is_empty() {
            lines.push(format!("Replying to: {}", self.replying_to.join(", ")));
        }
        if let Some(thread) = non_blank(&self.thread_context) {
            lines.push(format!("Thread context:\n{}", thread));
        }

        lines.join("\n")
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_text_and_author() {
        assert!(GenerationRequest::new("hello", "alice").validate().is_ok());
        assert_eq!(
            GenerationRequest::new("  ", "alice").validate(),
            Err(ModelError::MissingField("tweet_text"))
        );
        assert_eq!(
            GenerationRequest::new("hello", "").validate(),
            Err(ModelError::MissingField("author"))
        );
    }

    #[test]
    fn test_deserialize_wire_names() {
        let json = r#"{
            "tweet_text": "Company X ships feature Y",
            "author": "alice",
            "user_bio": "builder",
            "user_followers": "1.2K",
            "replying_to": ["bob"]
        }"#;
        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.text, "Company X ships feature Y");
        assert_eq!(request.author_bio.as_deref(), Some("builder"));
        assert_eq!(request.author_followers.as_deref(), Some("1.2K"));
        assert_eq!(request.replying_to, vec!["bob".to_string()]);
        assert!(request.thread_context.is_none());
    }

    #[test]
    fn test_context_summary_skips_blank_fields() {
        let mut request = GenerationRequest::new("hi", "alice");
        assert_eq!(request.context_summary(), "");

        request.author_bio = Some("   ".to_string());
        request.replying_to = vec!["bob".to_string(), "carol".to_string()];
        assert_eq!(request.context_summary(), "Replying to: bob, carol");
    }
}
