//! Text completion: the `TextModel` seam and its Gemini adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeminiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::metrics::record_text_request;

/// One prompt for a text model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Short name of the calling step, used in logs and metrics.
    pub label: &'static str,
    pub prompt: String,
    /// Ask the model for a JSON document.
    pub json_output: bool,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(label: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            label,
            prompt: prompt.into(),
            json_output: false,
            temperature: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Prompt in, text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> GenAiResult<String>;
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini text model with an ordered model fallback chain.
pub struct GeminiTextModel {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextModel {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> GenAiResult<Self> {
        if config.models.is_empty() {
            return Err(GenAiError::config("at least one Gemini model is required"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenAiError::Network)?;

        Ok(Self { config, client })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Call one Gemini model.
    async fn call_model(&self, model: &str, request: &CompletionRequest) -> GenAiResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: request
                    .json_output
                    .then(|| "application/json".to_string()),
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(
                status,
                format!("Gemini API returned {}: {}", status, error_text),
            ));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            GenAiError::invalid_response(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text: String = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenAiError::invalid_response("No content in Gemini response"));
        }

        Ok(text)
    }
}

#[async_trait]
impl TextModel for GeminiTextModel {
    async fn complete(&self, request: &CompletionRequest) -> GenAiResult<String> {
        let mut last_error = None;

        for model in &self.config.models {
            debug!(label = request.label, model = %model, "Calling Gemini");
            match self.call_model(model, request).await {
                Ok(text) => {
                    record_text_request(request.label, model, true);
                    info!(label = request.label, model = %model, "Gemini call succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    record_text_request(request.label, model, false);
                    warn!(label = request.label, model = %model, "Gemini call failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GenAiError::request_failed("All Gemini models failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, models: &[&str]) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    fn gemini_body(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn test_complete_returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/fast:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("announcement")))
            .mount(&server)
            .await;

        let model = GeminiTextModel::new(config_for(&server, &["fast"])).unwrap();
        let text = model
            .complete(&CompletionRequest::new("classify", "classify this"))
            .await
            .unwrap();
        assert_eq!(text, "announcement");
    }

    #[tokio::test]
    async fn test_falls_back_to_next_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/primary:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/backup:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("{\"title\":\"x\"}")))
            .mount(&server)
            .await;

        let model = GeminiTextModel::new(config_for(&server, &["primary", "backup"])).unwrap();
        let text = model
            .complete(&CompletionRequest::new("storyline", "write").json())
            .await
            .unwrap();
        assert_eq!(text, "{\"title\":\"x\"}");
    }

    #[tokio::test]
    async fn test_all_models_failing_surfaces_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let model = GeminiTextModel::new(config_for(&server, &["a", "b"])).unwrap();
        let err = model
            .complete(&CompletionRequest::new("classify", "x"))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_empty_candidates_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let model = GeminiTextModel::new(config_for(&server, &["a"])).unwrap();
        let err = model
            .complete(&CompletionRequest::new("classify", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::InvalidResponse(_)));
    }

    #[test]
    fn test_requires_a_model() {
        let config = GeminiConfig {
            models: vec![],
            ..Default::default()
        };
        assert!(matches!(
            GeminiTextModel::new(config),
            Err(GenAiError::Config(_))
        ));
    }
}
