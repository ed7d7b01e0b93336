//! Text-to-speech collaborator
//!
//! Synthesizes speech via the OpenAI TTS API and plays it through the
//! default output device. `speak` blocks for the playback duration, so the
//! pipeline runs it on a background task.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::audio::AudioPlayback;
use crate::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Speaks text out loud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Synthesize and play `text`, returning once playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Synthesizes speech from text via the OpenAI TTS API
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    voice: String,
    speed: f32,
    api_base: String,
}

impl TextToSpeech {
    /// Create a new TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, model: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            voice,
            speed,
            api_base: OPENAI_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (used by tests against a mock server)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

/// [`Speaker`] that synthesizes remotely and plays locally
pub struct ApiSpeaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl ApiSpeaker {
    /// Combine a TTS client with an output device
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait]
impl Speaker for ApiSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::debug!(text_len = text.len(), "speaking");

        let audio = self.tts.synthesize(text).await?;

        let playback = self.playback.clone();
        tokio::task::spawn_blocking(move || playback.play_mp3_blocking(&audio))
            .await
            .map_err(|e| Error::Tts(format!("playback task failed: {e}")))?
    }
}
