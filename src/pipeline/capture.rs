//! Capture loop
//!
//! One long-lived loop per listening session, owning the microphone
//! exclusively. Each completed utterance is handed to the controller and the
//! loop immediately resumes; a timeout with no speech just loops again; any
//! other failure ends the loop and is reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use super::messages::PipelineEvent;
use crate::Result;
use crate::audio::{AudioClip, AudioSource, Capture, MicSource};
use crate::config::CaptureConfig;

/// A capture loop's channel back to the controller
#[derive(Clone)]
pub struct CaptureFeed {
    tx: UnboundedSender<PipelineEvent>,
}

impl CaptureFeed {
    pub(crate) fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }

    /// Deliver one captured utterance
    pub fn utterance(&self, clip: AudioClip) {
        let _ = self.tx.send(PipelineEvent::Captured(clip));
    }

    /// Report that the capture loop died on a non-timeout error
    pub fn failed(&self, error: impl Into<String>) {
        let _ = self.tx.send(PipelineEvent::CaptureFailed(error.into()));
    }
}

/// Spawns a capture loop for one listening session
///
/// The controller calls `spawn` on every Idle→Listening transition with a
/// fresh stop flag. Implementations must return quickly; the loop itself
/// runs elsewhere (a dedicated thread for the microphone).
pub trait CaptureSpawner: Send {
    /// Start a capture loop feeding `feed` until `stop` is set
    ///
    /// # Errors
    ///
    /// Returns error if the loop cannot be started at all
    fn spawn(&mut self, cfg: &CaptureConfig, stop: Arc<AtomicBool>, feed: CaptureFeed)
    -> Result<()>;
}

/// Drive one capture loop to completion
///
/// Runs until the stop flag is set or the source fails. Timeouts are
/// expected and silently retried; utterances are handed off without waiting
/// for recognition, so several recognitions may be in flight at once.
pub fn run_capture_loop<S: AudioSource>(
    source: &mut S,
    cfg: &CaptureConfig,
    stop: &AtomicBool,
    feed: &CaptureFeed,
) {
    while !stop.load(Ordering::Acquire) {
        match source.capture_utterance(cfg.wait_timeout, cfg.phrase_limit) {
            Ok(Capture::TimedOut) => {}
            Ok(Capture::Utterance(clip)) => {
                tracing::debug!(duration_ms = clip.duration().as_millis(), "utterance captured");
                feed.utterance(clip);
            }
            Err(e) => {
                tracing::error!(error = %e, "capture failed, stopping loop");
                feed.failed(e.to_string());
                return;
            }
        }
    }

    tracing::debug!("capture loop stopped");
}

/// [`CaptureSpawner`] backed by the default microphone
///
/// cpal input streams are not `Send`, so the [`MicSource`] is constructed
/// inside the capture thread. Ambient calibration runs once, on the first
/// spawn; later sessions reuse the learned threshold.
pub struct MicCaptureSpawner {
    threshold: Arc<Mutex<Option<f32>>>,
}

impl MicCaptureSpawner {
    /// Create a spawner that calibrates on first use
    #[must_use]
    pub fn new() -> Self {
        Self {
            threshold: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for MicCaptureSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSpawner for MicCaptureSpawner {
    fn spawn(
        &mut self,
        cfg: &CaptureConfig,
        stop: Arc<AtomicBool>,
        feed: CaptureFeed,
    ) -> Result<()> {
        let cfg = cfg.clone();
        let threshold = Arc::clone(&self.threshold);

        std::thread::Builder::new()
            .name("retell-capture".to_string())
            .spawn(move || {
                let mut source = match MicSource::open() {
                    Ok(source) => source,
                    Err(e) => {
                        feed.failed(e.to_string());
                        return;
                    }
                };

                let known = threshold.lock().ok().and_then(|t| *t);
                if let Some(known) = known {
                    source.set_threshold(known);
                } else {
                    if let Err(e) = source.calibrate(cfg.calibration) {
                        feed.failed(e.to_string());
                        return;
                    }
                    if let Ok(mut slot) = threshold.lock() {
                        *slot = Some(source.threshold());
                    }
                }

                run_capture_loop(&mut source, &cfg, &stop, &feed);
            })
            .map_err(|e| crate::Error::Audio(format!("failed to spawn capture thread: {e}")))?;

        Ok(())
    }
}
