//! Speech-to-text collaborator
//!
//! Transcription is delegated to the OpenAI Whisper API; the pipeline only
//! sees the narrow [`Transcriber`] interface.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::audio::{AudioClip, samples_to_wav};
use crate::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Outcome of a successful transcription call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcription {
    /// Recognized speech
    Text(String),
    /// The service produced no words; expected for mumbles and noise,
    /// discarded without comment
    Unintelligible,
}

/// Transcribes one utterance to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a captured clip
    ///
    /// # Errors
    ///
    /// Returns error if the transcription service fails
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcription>;
}

/// [`Transcriber`] backed by OpenAI Whisper
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    api_base: String,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
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
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcription> {
        let wav = samples_to_wav(&clip.samples, clip.sample_rate)?;
        tracing::debug!(
            audio_bytes = wav.len(),
            duration_ms = clip.duration().as_millis(),
            "starting transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        if result.text.trim().is_empty() {
            tracing::debug!("utterance was unintelligible");
            return Ok(Transcription::Unintelligible);
        }

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(Transcription::Text(result.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let result =
            WhisperTranscriber::new(SecretString::from(String::new()), "whisper-1".to_string());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn whisper_response_parses() {
        let parsed: WhisperResponse = serde_json::from_str(r#"{"text": "hello world"}"#).unwrap();
        assert_eq!(parsed.text, "hello world");
    }
}
