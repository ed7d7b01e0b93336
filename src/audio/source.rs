//! Utterance source
//!
//! [`AudioSource`] is the capture loop's view of the microphone: one bounded
//! utterance capture at a time. [`MicSource`] implements it over the cpal
//! stream and the energy endpointer; tests substitute scripted sources.

use std::time::{Duration, Instant};

use super::{AudioCapture, AudioClip, SAMPLE_RATE, UtteranceDetector, rms_energy};
use crate::Result;

/// How often the capture loop drains the input buffer
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of one bounded capture attempt
#[derive(Debug)]
pub enum Capture {
    /// A complete utterance was captured
    Utterance(AudioClip),
    /// No speech started within the wait timeout (expected, not an error)
    TimedOut,
}

/// A source of single-utterance audio clips
///
/// Implementations block for up to `wait_timeout` waiting for speech to
/// start and cap the utterance at `phrase_limit` once it has.
pub trait AudioSource {
    /// Measure ambient noise for `duration` and derive the speech threshold
    ///
    /// # Errors
    ///
    /// Returns error if the audio device fails
    fn calibrate(&mut self, duration: Duration) -> Result<()>;

    /// Capture one bounded utterance
    ///
    /// # Errors
    ///
    /// Returns error if the audio device fails mid-capture
    fn capture_utterance(
        &mut self,
        wait_timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Capture>;
}

/// Microphone-backed [`AudioSource`]
///
/// Owns the input stream exclusively; constructed inside the capture thread
/// because cpal streams are not `Send`.
pub struct MicSource {
    capture: AudioCapture,
    detector: UtteranceDetector,
}

impl MicSource {
    /// Open the default microphone
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened
    pub fn open() -> Result<Self> {
        let capture = AudioCapture::open()?;

        Ok(Self {
            capture,
            detector: UtteranceDetector::new(),
        })
    }

    /// Current endpointing threshold
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.detector.threshold()
    }

    /// Set the endpointing threshold, skipping calibration
    pub const fn set_threshold(&mut self, threshold: f32) {
        self.detector.set_threshold(threshold);
    }

    fn clip(samples: Vec<f32>) -> AudioClip {
        AudioClip {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl AudioSource for MicSource {
    fn calibrate(&mut self, duration: Duration) -> Result<()> {
        self.capture.start()?;
        self.capture.clear_buffer();

        std::thread::sleep(duration);

        let ambient = self.capture.take_buffer();
        let threshold = self.detector.calibrate(&ambient);

        tracing::info!(
            ambient_rms = rms_energy(&ambient),
            threshold,
            "microphone calibrated"
        );

        Ok(())
    }

    fn capture_utterance(
        &mut self,
        wait_timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Capture> {
        self.capture.start()?;
        self.capture.clear_buffer();
        self.detector.reset();

        let wait_started = Instant::now();
        let mut speech_started: Option<Instant> = None;

        loop {
            std::thread::sleep(POLL_INTERVAL);

            let samples = self.capture.take_buffer();
            if let Some(utterance) = self.detector.push(&samples) {
                return Ok(Capture::Utterance(Self::clip(utterance)));
            }

            if self.detector.in_speech() {
                let started = *speech_started.get_or_insert_with(Instant::now);
                if started.elapsed() >= phrase_limit {
                    tracing::debug!("phrase limit reached, force-completing utterance");
                    return Ok(Capture::Utterance(Self::clip(self.detector.take_segment())));
                }
            } else {
                // A discarded noise burst drops us back to waiting
                speech_started = None;
                if wait_started.elapsed() >= wait_timeout {
                    return Ok(Capture::TimedOut);
                }
            }
        }
    }
}
