//! Audio input/output
//!
//! Microphone capture with ambient-noise calibration and utterance
//! endpointing, plus speaker playback for synthesized speech.

mod capture;
mod endpoint;
mod playback;
mod source;

use std::time::Duration;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{SegmentState, UtteranceDetector};
pub use playback::AudioPlayback;
pub use source::{AudioSource, Capture, MicSource};

/// One bounded span of captured audio, intended to hold a single phrase
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono f32 samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioClip {
    /// Length of the clip
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
