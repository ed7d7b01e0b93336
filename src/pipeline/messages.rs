//! Message types passed between the presentation layer, the controller, and
//! its background tasks.

use crate::audio::AudioClip;

/// User intents forwarded by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin continuous listening (no-op when already listening)
    StartListening,
    /// Stop scheduling new captures (in-flight recognitions still complete)
    StopListening,
    /// Enhance the current transcript
    Enhance,
    /// Play back one of the text buffers
    Speak(SpeakTarget),
    /// Reset both text buffers
    Clear,
    /// Stop the controller loop
    Shutdown,
}

/// Which buffer to play back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakTarget {
    /// The raw transcript
    Transcript,
    /// The AI-enhanced text
    Enhanced,
}

/// Results marshalled from background tasks back to the controller task
///
/// Background tasks never mutate shared state; they only send these.
#[derive(Debug)]
pub(crate) enum PipelineEvent {
    /// The capture loop produced one utterance
    Captured(AudioClip),
    /// The capture loop died on a non-timeout error
    CaptureFailed(String),
    /// A recognition task produced text
    Recognized { utterance: u64, text: String },
    /// A recognition task found no words (discarded silently)
    Unintelligible { utterance: u64 },
    /// A recognition task hit a service error
    RecognitionFailed { utterance: u64, error: String },
    /// The in-flight enhancement finished
    EnhanceSucceeded(String),
    /// The in-flight enhancement failed (enhanced text left unchanged)
    EnhanceFailed(String),
    /// A playback task failed
    PlaybackFailed(String),
}

/// Discrete notifications pushed to the presentation layer
///
/// The presentation layer renders these as they arrive; it never polls
/// controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Full transcript text replacement
    Transcript(String),
    /// Enhanced text replacement
    Enhanced(String),
    /// Ephemeral status line, last writer wins
    Status(String),
    /// Listening toggled (drives the record button)
    Listening(bool),
    /// Enhancement availability (drives the enhance button)
    EnhanceBusy(bool),
}
