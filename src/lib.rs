//! Retell - voice transcript desk
//!
//! Continuous dictation wired to three remote capabilities: speech-to-text,
//! LLM transcript enhancement, and text-to-speech playback. The interesting
//! part is the pipeline controller: a single state-owning task that
//! serializes results arriving from concurrent background work.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Presentation (console)                  │
//! │        intents ↓            notifications ↑          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               PipelineController                     │
//! │  capture loop │ recognition tasks │ enhance │ speak  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          Remote services (OpenAI APIs)               │
//! │      Whisper  │  chat completions  │  TTS            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The capture loop owns the microphone on a dedicated thread; each
//! utterance spawns an independent recognition task, so transcript appends
//! follow completion order, not capture order. Enhancement is single-flight;
//! playback runs on background tasks. Every result is marshalled back to
//! the controller task before any shared state changes.

pub mod audio;
pub mod config;
pub mod enhance;
pub mod error;
pub mod pipeline;
pub mod setup;
pub mod stt;
pub mod transcript;
pub mod tts;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{
    Command, Notification, PipelineBuilder, PipelineController, PipelineHandle, SpeakTarget,
};
pub use transcript::Transcript;
