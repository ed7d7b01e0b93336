//! Utterance endpointing
//!
//! Energy-based segmentation of the microphone stream into single-phrase
//! utterances: speech starts when energy rises above the ambient threshold
//! and ends after a run of trailing silence. The threshold is calibrated
//! once at startup from a short ambient-noise sample.

use super::rms_energy;

/// Fallback energy threshold when no calibration has run
const DEFAULT_THRESHOLD: f32 = 0.03;

/// Lowest threshold calibration may pick (guards against dead-silent rooms)
const MIN_THRESHOLD: f32 = 0.01;

/// Calibrated threshold is ambient RMS scaled by this margin
const AMBIENT_MARGIN: f32 = 2.0;

/// Minimum speech length to count as an utterance (samples at 16kHz, 0.3s)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (samples at 16kHz, 0.5s)
const SILENCE_SAMPLES: usize = 8000;

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// No speech yet
    Waiting,
    /// Inside an utterance, accumulating samples
    Speech,
}

/// Segments a sample stream into utterances
#[derive(Debug)]
pub struct UtteranceDetector {
    threshold: f32,
    state: SegmentState,
    segment: Vec<f32>,
    silence_samples: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    /// Create a detector with the default energy threshold
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            state: SegmentState::Waiting,
            segment: Vec::new(),
            silence_samples: 0,
        }
    }

    /// Derive the speech threshold from an ambient-noise sample
    ///
    /// Returns the chosen threshold.
    pub fn calibrate(&mut self, ambient: &[f32]) -> f32 {
        let ambient_rms = rms_energy(ambient);
        self.threshold = (ambient_rms * AMBIENT_MARGIN).max(MIN_THRESHOLD);

        tracing::debug!(
            ambient_rms,
            threshold = self.threshold,
            "ambient calibration complete"
        );

        self.threshold
    }

    /// Feed a chunk of samples
    ///
    /// Returns a completed utterance once enough speech has been followed by
    /// trailing silence. A too-short burst (a door slam, a cough) is dropped
    /// without completing.
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let is_speech = rms_energy(samples) > self.threshold;

        match self.state {
            SegmentState::Waiting => {
                if is_speech {
                    self.state = SegmentState::Speech;
                    self.segment.clear();
                    self.segment.extend_from_slice(samples);
                    self.silence_samples = 0;
                    tracing::trace!("speech started");
                }
                None
            }
            SegmentState::Speech => {
                self.segment.extend_from_slice(samples);

                if is_speech {
                    self.silence_samples = 0;
                } else {
                    self.silence_samples += samples.len();
                }

                if self.silence_samples > SILENCE_SAMPLES {
                    if self.segment.len() - self.silence_samples > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.segment.len(), "utterance complete");
                        return Some(self.take_segment());
                    }

                    // Noise blip, not speech
                    tracing::trace!("discarding short burst");
                    self.reset();
                }

                None
            }
        }
    }

    /// Whether the detector is inside an utterance
    #[must_use]
    pub fn in_speech(&self) -> bool {
        self.state == SegmentState::Speech
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmentState {
        self.state
    }

    /// Configured energy threshold
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Set the energy threshold directly (skipping calibration)
    pub const fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Take the accumulated segment and return to waiting
    ///
    /// Used by the capture loop to force-complete an utterance that hit the
    /// phrase limit before going silent.
    pub fn take_segment(&mut self) -> Vec<f32> {
        let segment = std::mem::take(&mut self.segment);
        self.state = SegmentState::Waiting;
        self.silence_samples = 0;
        segment
    }

    /// Discard any partial segment and return to waiting
    pub fn reset(&mut self) {
        self.segment.clear();
        self.state = SegmentState::Waiting;
        self.silence_samples = 0;
    }
}
