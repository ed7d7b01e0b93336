//! Transcript enhancement collaborator
//!
//! Sends the full transcript to a chat-completion model that fixes grammar
//! and structure while keeping the meaning. Model choice comes from config;
//! temperature and response length are fixed constants.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Sampling temperature for enhancement (low: stay close to the source)
const TEMPERATURE: f32 = 0.3;

/// Response length cap
const MAX_TOKENS: u32 = 1000;

/// System preamble framing the enhancement task
const SYSTEM_PREAMBLE: &str = "You are a helpful assistant that enhances speech transcripts. \
     Fix grammar, improve structure, and make the text more coherent while \
     maintaining the original meaning.";

/// Chat-completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

/// A message in the request
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat-completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Rewrites a transcript into cleaner text
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Enhance the transcript, returning the rewritten text
    ///
    /// # Errors
    ///
    /// Returns error if the enhancement service fails
    async fn enhance(&self, transcript: &str) -> Result<String>;
}

/// [`Enhancer`] backed by the OpenAI chat-completions API
pub struct OpenAiEnhancer {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    api_base: String,
}

impl OpenAiEnhancer {
    /// Create a new enhancer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for enhancement".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            api_base: OPENAI_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (used by tests against a mock server)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Enhancer for OpenAiEnhancer {
    async fn enhance(&self, transcript: &str) -> Result<String> {
        let prompt =
            format!("Please enhance and improve the following speech transcript:\n\n{transcript}");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PREAMBLE,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(
            model = %self.model,
            transcript_len = transcript.len(),
            "requesting enhancement"
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "enhancement request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "enhancement API error");
            return Err(Error::Enhance(format!("API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse enhancement response");
            e
        })?;

        let enhanced = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Enhance("empty response from enhancement API".to_string()))?;

        tracing::info!(enhanced_len = enhanced.len(), "enhancement complete");
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let result = OpenAiEnhancer::new(SecretString::from(String::new()), "gpt-4".to_string());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{"choices": [{"message": {"content": "Cleaned up text."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Cleaned up text.")
        );
    }

    #[test]
    fn request_serializes_fixed_constants() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: vec![ChatMessage {
                role: "system",
                content: SYSTEM_PREAMBLE,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 1000);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }
}
