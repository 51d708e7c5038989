//! Generative model collaborator
//!
//! Everything that talks to the remote model sits behind [`ModelClient`], so
//! callers receive the client explicitly and tests substitute a fake.

pub mod gemini;

pub use gemini::GeminiClient;

use serde::Serialize;
use thiserror::Error;

/// Sampling settings sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_output_tokens: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("no API key configured (set GOOGLE_AI_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("model endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("could not parse model response: {0}")]
    Parse(String),

    #[error("model returned no text ({reason})")]
    EmptyResponse { reason: String },
}

/// A text-completion service: one prompt in, one completion out
pub trait ModelClient: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

impl<C: ModelClient + ?Sized> ModelClient for &C {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        (**self).generate(prompt)
    }
}

impl<C: ModelClient + ?Sized> ModelClient for Box<C> {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        (**self).generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ModelClient for Echo {
        fn generate(&self, prompt: &str) -> Result<String, ModelError> {
            Ok(prompt.to_uppercase())
        }
    }

    #[test]
    fn test_default_generation_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_output_tokens, 200);
    }

    fn call<C: ModelClient>(client: C, prompt: &str) -> String {
        client.generate(prompt).unwrap()
    }

    #[test]
    fn test_boxed_and_borrowed_clients_delegate() {
        let boxed: Box<dyn ModelClient> = Box::new(Echo);
        assert_eq!(call(boxed, "hi"), "HI");

        let borrowed: &dyn ModelClient = &Echo;
        assert_eq!(call(borrowed, "ok"), "OK");
    }

    #[test]
    fn test_error_messages() {
        let err = ModelError::Status { code: 429, body: "quota".to_string() };
        assert_eq!(err.to_string(), "model endpoint returned HTTP 429: quota");
        assert!(ModelError::MissingApiKey.to_string().contains("GOOGLE_AI_KEY"));
    }
}
