//! Pipeline controller
//!
//! The single owner of all shared pipeline state. User intents arrive as
//! [`Command`]s, background tasks report back through [`PipelineEvent`]s,
//! and every mutation of the transcript, the enhanced text, and the status
//! happens on this one task; concurrent completions can never interleave a
//! read-modify-write. The presentation layer receives [`Notification`]s.

mod capture;
mod messages;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub use capture::{CaptureFeed, CaptureSpawner, MicCaptureSpawner, run_capture_loop};
pub use messages::{Command, Notification, SpeakTarget};

use messages::PipelineEvent;

use crate::audio::AudioClip;
use crate::config::CaptureConfig;
use crate::enhance::Enhancer;
use crate::stt::{Transcriber, Transcription};
use crate::transcript::Transcript;
use crate::tts::Speaker;

/// Status shown when a request needs the missing API credential
const NO_CREDENTIAL: &str = "OpenAI API key not configured";

/// Cloneable command sender for the presentation layer
#[derive(Clone)]
pub struct PipelineHandle {
    tx: UnboundedSender<Command>,
}

impl PipelineHandle {
    /// Begin continuous listening
    pub fn start_listening(&self) {
        let _ = self.tx.send(Command::StartListening);
    }

    /// Stop scheduling new captures
    pub fn stop_listening(&self) {
        let _ = self.tx.send(Command::StopListening);
    }

    /// Request transcript enhancement
    pub fn enhance(&self) {
        let _ = self.tx.send(Command::Enhance);
    }

    /// Request playback of one of the buffers
    pub fn speak(&self, target: SpeakTarget) {
        let _ = self.tx.send(Command::Speak(target));
    }

    /// Reset both text buffers
    pub fn clear(&self) {
        let _ = self.tx.send(Command::Clear);
    }

    /// Stop the controller loop
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Collaborators and wiring for a [`PipelineController`]
///
/// The transcriber, enhancer, and speaker are optional: a missing credential
/// degrades the matching request to a rejection, never a crash.
pub struct PipelineBuilder {
    capture_cfg: CaptureConfig,
    spawner: Box<dyn CaptureSpawner>,
    transcriber: Option<Arc<dyn Transcriber>>,
    enhancer: Option<Arc<dyn Enhancer>>,
    speaker: Option<Arc<dyn Speaker>>,
}

impl PipelineBuilder {
    /// Start building a pipeline around a capture spawner
    #[must_use]
    pub fn new(capture_cfg: CaptureConfig, spawner: Box<dyn CaptureSpawner>) -> Self {
        Self {
            capture_cfg,
            spawner,
            transcriber: None,
            enhancer: None,
            speaker: None,
        }
    }

    /// Attach a transcriber
    #[must_use]
    pub fn transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Attach an enhancer
    #[must_use]
    pub fn enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Attach a speaker
    #[must_use]
    pub fn speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    /// Finish the wiring
    ///
    /// Returns the controller (to be driven with
    /// [`PipelineController::run`]), a handle for the presentation layer,
    /// and the notification stream it should render.
    #[must_use]
    pub fn build(self) -> (PipelineController, PipelineHandle, UnboundedReceiver<Notification>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let recognition_slots =
            Arc::new(Semaphore::new(self.capture_cfg.max_in_flight_recognitions));

        let controller = PipelineController {
            commands: command_rx,
            events: event_rx,
            event_tx,
            notifications: notify_tx,
            capture_cfg: self.capture_cfg,
            spawner: self.spawner,
            transcriber: self.transcriber,
            enhancer: self.enhancer,
            speaker: self.speaker,
            recognition_slots,
            listening: false,
            stop_flag: None,
            transcript: Transcript::new(),
            enhanced: None,
            enhance_in_flight: false,
            next_utterance: 0,
        };

        (controller, PipelineHandle { tx: command_tx }, notify_rx)
    }
}

/// The listening/transcribe/enhance/speak state machine
pub struct PipelineController {
    commands: UnboundedReceiver<Command>,
    events: UnboundedReceiver<PipelineEvent>,
    event_tx: UnboundedSender<PipelineEvent>,
    notifications: UnboundedSender<Notification>,

    capture_cfg: CaptureConfig,
    spawner: Box<dyn CaptureSpawner>,
    transcriber: Option<Arc<dyn Transcriber>>,
    enhancer: Option<Arc<dyn Enhancer>>,
    speaker: Option<Arc<dyn Speaker>>,
    recognition_slots: Arc<Semaphore>,

    listening: bool,
    stop_flag: Option<Arc<AtomicBool>>,
    transcript: Transcript,
    enhanced: Option<String>,
    enhance_in_flight: bool,
    next_utterance: u64,
}

impl PipelineController {
    /// Run the controller until shutdown
    ///
    /// Exits when [`Command::Shutdown`] arrives or every
    /// [`PipelineHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("pipeline controller running");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }
            }
        }

        self.signal_capture_stop();
        tracing::debug!("pipeline controller stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::StartListening => self.start_listening(),
            Command::StopListening => self.stop_listening(),
            Command::Enhance => self.enhance(),
            Command::Speak(target) => self.speak(target),
            Command::Clear => self.clear(),
            // Consumed by `run` before dispatch
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Captured(clip) => self.dispatch_recognition(clip),
            PipelineEvent::CaptureFailed(error) => {
                self.status(format!("Listening error: {error}"));
                // A dead capture loop must not leave the UI stuck on
                // "listening"; force the transition back to idle.
                if self.listening {
                    self.signal_capture_stop();
                    self.listening = false;
                    self.notify(Notification::Listening(false));
                }
            }
            PipelineEvent::Recognized { utterance, text } => {
                tracing::debug!(utterance, text = %text, "utterance recognized");
                self.transcript.append(text);
                self.notify(Notification::Transcript(self.transcript.render()));
            }
            PipelineEvent::Unintelligible { utterance } => {
                // Expected for mumbles and noise; no status change
                tracing::trace!(utterance, "utterance discarded as unintelligible");
            }
            PipelineEvent::RecognitionFailed { utterance, error } => {
                tracing::warn!(utterance, error = %error, "recognition failed");
                self.status(format!("Speech recognition error: {error}"));
            }
            PipelineEvent::EnhanceSucceeded(text) => {
                self.enhance_in_flight = false;
                self.enhanced = Some(text.clone());
                self.notify(Notification::Enhanced(text));
                self.notify(Notification::EnhanceBusy(false));
                self.status("AI enhancement complete");
            }
            PipelineEvent::EnhanceFailed(error) => {
                self.enhance_in_flight = false;
                self.notify(Notification::EnhanceBusy(false));
                self.status(format!("AI enhancement failed: {error}"));
            }
            PipelineEvent::PlaybackFailed(error) => {
                self.status(format!("Text-to-speech failed: {error}"));
            }
        }
    }

    /// Idle → Listening; idempotent when already listening
    fn start_listening(&mut self) {
        if self.listening {
            tracing::debug!("already listening, ignoring start");
            return;
        }

        if self.transcriber.is_none() {
            self.status(format!("{NO_CREDENTIAL} - cannot transcribe"));
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let feed = CaptureFeed::new(self.event_tx.clone());

        match self.spawner.spawn(&self.capture_cfg, Arc::clone(&stop), feed) {
            Ok(()) => {
                self.stop_flag = Some(stop);
                self.listening = true;
                self.notify(Notification::Listening(true));
                self.status("Recording... speak now");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to start capture");
                self.status(format!("Listening error: {e}"));
            }
        }
    }

    /// Listening → Idle
    ///
    /// The capture loop exits after its current wait; recognition tasks
    /// already in flight are not cancelled and still deliver their results.
    fn stop_listening(&mut self) {
        if !self.listening {
            return;
        }

        self.signal_capture_stop();
        self.listening = false;
        self.notify(Notification::Listening(false));
        self.status("Recording stopped");
    }

    fn signal_capture_stop(&mut self) {
        if let Some(stop) = self.stop_flag.take() {
            stop.store(true, Ordering::Release);
        }
    }

    /// Spawn a detached recognition task for one captured utterance
    ///
    /// Tasks are gated by a semaphore so a fast talker cannot fan out
    /// unbounded concurrent recognition requests. Completion order across
    /// tasks is not guaranteed to match capture order; appends follow
    /// completion order.
    fn dispatch_recognition(&mut self, clip: AudioClip) {
        let Some(transcriber) = self.transcriber.clone() else {
            return;
        };

        let utterance = self.next_utterance;
        self.next_utterance += 1;

        let slots = Arc::clone(&self.recognition_slots);
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                return;
            };

            let event = match transcriber.transcribe(&clip).await {
                Ok(Transcription::Text(text)) => PipelineEvent::Recognized { utterance, text },
                Ok(Transcription::Unintelligible) => PipelineEvent::Unintelligible { utterance },
                Err(e) => PipelineEvent::RecognitionFailed {
                    utterance,
                    error: e.to_string(),
                },
            };

            let _ = tx.send(event);
        });
    }

    /// Single-flight transcript enhancement
    fn enhance(&mut self) {
        if self.transcript.is_empty() {
            self.status("No transcript to enhance");
            return;
        }

        let Some(enhancer) = self.enhancer.clone() else {
            self.status(format!("{NO_CREDENTIAL} - cannot enhance"));
            return;
        };

        if self.enhance_in_flight {
            self.status("Enhancement already in progress");
            return;
        }

        self.enhance_in_flight = true;
        self.notify(Notification::EnhanceBusy(true));
        self.status("Enhancing with AI...");

        let snapshot = self.transcript.render();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let event = match enhancer.enhance(&snapshot).await {
                Ok(text) => PipelineEvent::EnhanceSucceeded(text),
                Err(e) => PipelineEvent::EnhanceFailed(e.to_string()),
            };

            let _ = tx.send(event);
        });
    }

    /// Play back one of the buffers on a background task
    fn speak(&mut self, target: SpeakTarget) {
        let text = match target {
            SpeakTarget::Transcript => self.transcript.render(),
            SpeakTarget::Enhanced => self.enhanced.clone().unwrap_or_default(),
        };

        if text.trim().is_empty() {
            self.status(match target {
                SpeakTarget::Transcript => "No transcript to speak",
                SpeakTarget::Enhanced => "No enhanced text to speak",
            });
            return;
        }

        let Some(speaker) = self.speaker.clone() else {
            self.status(format!("{NO_CREDENTIAL} - cannot speak"));
            return;
        };

        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = speaker.speak(&text).await {
                let _ = tx.send(PipelineEvent::PlaybackFailed(e.to_string()));
            }
        });
    }

    /// Reset both buffers; listening state is untouched
    fn clear(&mut self) {
        self.transcript.clear();
        self.enhanced = None;
        self.notify(Notification::Transcript(String::new()));
        self.notify(Notification::Enhanced(String::new()));
        self.status("All text cleared");
    }

    fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }

    fn status(&self, message: impl Into<String>) {
        self.notify(Notification::Status(message.into()));
    }
}
