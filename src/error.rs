//! Error types for retell

use thiserror::Error;

/// Result type alias for retell operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in retell
///
/// Expected pipeline outcomes are not errors: a capture timeout is
/// [`crate::audio::Capture::TimedOut`] and unintelligible speech is
/// [`crate::stt::Transcription::Unintelligible`]. Everything here is a
/// service or environment failure, contained per-operation and surfaced as a
/// status message, never fatal to the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Transcript enhancement error
    #[error("enhance error: {0}")]
    Enhance(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
