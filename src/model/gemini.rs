//! Google Generative Language API client (`generateContent`)
//!
//! Blocking, one request per prompt. Timeouts are the agent's; there is no
//! retry.

use super::{GenerationConfig, ModelClient, ModelError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: WireConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig {
    temperature: f64,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            agent: build_agent(DEFAULT_TIMEOUT_SECS),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            config: GenerationConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Model resource name, e.g. `models/gemini-1.5-flash` or `tunedModels/<id>`
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.agent = build_agent(secs);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;
        let body = request_body(prompt, &self.config)?;

        log::debug!("POST {} ({} prompt bytes)", self.url(), prompt.len());

        let response = self
            .agent
            .post(&self.url())
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", api_key)
            .send_string(&body);

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| ModelError::Transport(e.to_string()))?;
                parse_response(&text)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(ModelError::Status { code, body: body.trim().to_string() })
            }
            Err(e) => Err(ModelError::Transport(e.to_string())),
        }
    }
}

fn build_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

fn request_body(prompt: &str, config: &GenerationConfig) -> Result<String, ModelError> {
    let request = GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
        generation_config: WireConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        },
    };
    serde_json::to_string(&request).map_err(|e| ModelError::Parse(e.to_string()))
}

/// Extract the completion text: all text parts of the first candidate
fn parse_response(body: &str) -> Result<String, ModelError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Parse(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ModelError::EmptyResponse { reason });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty content".to_string());
        return Err(ModelError::EmptyResponse { reason });
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = request_body("Assess this", &GenerationConfig::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Assess this");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 200);
        assert!((json["generationConfig"]["topP"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_request_body_sampling_values_are_exact() {
        let body = request_body("x", &GenerationConfig::default()).unwrap();
        assert!(body.contains(r#""temperature":0.7"#), "{}", body);
        assert!(body.contains(r#""topP":0.9"#), "{}", body);
    }

    #[test]
    fn test_parse_joins_text_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Risk is high. "}, {"text": "Patch now."}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(parse_response(body).unwrap(), "Risk is high. Patch now.");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert_eq!(
            parse_response(body),
            Err(ModelError::EmptyResponse { reason: "SAFETY".to_string() })
        );
    }

    #[test]
    fn test_parse_candidate_without_text() {
        let body = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        assert_eq!(
            parse_response(body),
            Err(ModelError::EmptyResponse { reason: "MAX_TOKENS".to_string() })
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>"), Err(ModelError::Parse(_))));
    }

    #[test]
    fn test_missing_key_fails_without_network() {
        let client = GeminiClient::new(Some("   ".to_string()));
        assert!(!client.is_configured());
        assert_eq!(client.generate("x"), Err(ModelError::MissingApiKey));
    }

    #[test]
    fn test_url_building() {
        let client = GeminiClient::new(None)
            .with_endpoint("http://localhost:8080/v1beta/")
            .with_model("tunedModels/inventory-risk");
        assert_eq!(client.url(), "http://localhost:8080/v1beta/tunedModels/inventory-risk:generateContent");
        assert_eq!(client.model(), "tunedModels/inventory-risk");
    }
}
