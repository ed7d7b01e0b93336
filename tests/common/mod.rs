//! Shared test doubles for pipeline tests
//!
//! Background collaborators are scripted queues; the capture side is either
//! an immediate clip feeder or a scripted [`AudioSource`] driven through the
//! real capture loop on a thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use retell::Result;
use retell::audio::{AudioClip, AudioSource, Capture, SAMPLE_RATE};
use retell::config::CaptureConfig;
use retell::enhance::Enhancer;
use retell::pipeline::{CaptureFeed, CaptureSpawner, Notification, run_capture_loop};
use retell::stt::{Transcriber, Transcription};
use retell::tts::Speaker;

/// A short test clip
pub fn clip() -> AudioClip {
    AudioClip {
        samples: vec![0.1; SAMPLE_RATE as usize / 10],
        sample_rate: SAMPLE_RATE,
    }
}

/// Capture config with small numbers for fast tests
pub fn test_capture_config() -> CaptureConfig {
    CaptureConfig {
        wait_timeout: Duration::from_millis(20),
        phrase_limit: Duration::from_millis(100),
        calibration: Duration::from_millis(1),
        max_in_flight_recognitions: 4,
    }
}

/// Scripted [`Transcriber`]: outcomes are popped in call order, each after
/// its own delay
pub struct MockTranscriber {
    script: Mutex<VecDeque<(Duration, Result<Transcription>)>>,
    calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(script: Vec<(Duration, Result<Transcription>)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Transcriber that instantly recognizes each given text in order
    pub fn recognizing(texts: &[&str]) -> Arc<Self> {
        Self::new(
            texts
                .iter()
                .map(|t| (Duration::ZERO, Ok(Transcription::Text((*t).to_string()))))
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<Transcription> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        let step = self.script.lock().unwrap().pop_front();
        let (delay, result) =
            step.unwrap_or((Duration::ZERO, Ok(Transcription::Unintelligible)));

        tokio::time::sleep(delay).await;
        result
    }
}

/// Scripted [`Enhancer`] with a call counter
pub struct MockEnhancer {
    delay: Duration,
    script: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl MockEnhancer {
    pub fn new(delay: Duration, script: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn returning(text: &str) -> Arc<Self> {
        Self::new(Duration::ZERO, vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Enhancer for MockEnhancer {
    async fn enhance(&self, _transcript: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        let result = self.script.lock().unwrap().pop_front();
        tokio::time::sleep(self.delay).await;

        result.unwrap_or_else(|| Ok(String::new()))
    }
}

/// [`Speaker`] that records what it was asked to say
pub struct MockSpeaker {
    pub spoken: Mutex<Vec<String>>,
    fail_with: Option<String>,
}

impl MockSpeaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }
}

#[async_trait]
impl Speaker for MockSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());

        match &self.fail_with {
            Some(message) => Err(retell::Error::Tts(message.clone())),
            None => Ok(()),
        }
    }
}

/// [`CaptureSpawner`] that feeds a fixed list of clips as soon as it spawns
///
/// Counts spawns so tests can assert start idempotency.
pub struct FeedSpawner {
    clips: Vec<AudioClip>,
    spawns: Arc<AtomicUsize>,
}

impl FeedSpawner {
    pub fn new(count: usize) -> (Self, Arc<AtomicUsize>) {
        let spawns = Arc::new(AtomicUsize::new(0));
        (
            Self {
                clips: (0..count).map(|_| clip()).collect(),
                spawns: Arc::clone(&spawns),
            },
            Arc::clone(&spawns),
        )
    }
}

impl CaptureSpawner for FeedSpawner {
    fn spawn(
        &mut self,
        _cfg: &CaptureConfig,
        _stop: Arc<AtomicBool>,
        feed: CaptureFeed,
    ) -> Result<()> {
        self.spawns.fetch_add(1, Ordering::AcqRel);

        let clips = self.clips.clone();
        tokio::spawn(async move {
            for clip in clips {
                feed.utterance(clip);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        Ok(())
    }
}

/// One scripted step of a [`ScriptedSource`]
pub enum SourceStep {
    Utterance,
    TimedOut,
    Fail(String),
}

/// Scripted [`AudioSource`] driven through the real capture loop
///
/// Exhausting the script yields timeouts forever. Counts capture attempts.
pub struct ScriptedSource {
    steps: VecDeque<SourceStep>,
    captures: Arc<AtomicUsize>,
}

impl AudioSource for ScriptedSource {
    fn calibrate(&mut self, _duration: Duration) -> Result<()> {
        Ok(())
    }

    fn capture_utterance(
        &mut self,
        wait_timeout: Duration,
        _phrase_limit: Duration,
    ) -> Result<Capture> {
        self.captures.fetch_add(1, Ordering::AcqRel);
        std::thread::sleep(wait_timeout);

        match self.steps.pop_front() {
            Some(SourceStep::Utterance) => Ok(Capture::Utterance(clip())),
            Some(SourceStep::Fail(message)) => Err(retell::Error::Audio(message)),
            Some(SourceStep::TimedOut) | None => Ok(Capture::TimedOut),
        }
    }
}

/// [`CaptureSpawner`] running a [`ScriptedSource`] through
/// [`run_capture_loop`] on a real thread (single use)
pub struct ThreadedSpawner {
    source: Option<ScriptedSource>,
    spawns: Arc<AtomicUsize>,
}

impl ThreadedSpawner {
    pub fn new(steps: Vec<SourceStep>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let spawns = Arc::new(AtomicUsize::new(0));
        let captures = Arc::new(AtomicUsize::new(0));

        (
            Self {
                source: Some(ScriptedSource {
                    steps: steps.into(),
                    captures: Arc::clone(&captures),
                }),
                spawns: Arc::clone(&spawns),
            },
            spawns,
            captures,
        )
    }
}

impl CaptureSpawner for ThreadedSpawner {
    fn spawn(
        &mut self,
        cfg: &CaptureConfig,
        stop: Arc<AtomicBool>,
        feed: CaptureFeed,
    ) -> Result<()> {
        self.spawns.fetch_add(1, Ordering::AcqRel);

        let mut source = self
            .source
            .take()
            .ok_or_else(|| retell::Error::Audio("source already consumed".to_string()))?;
        let cfg = cfg.clone();

        std::thread::spawn(move || {
            run_capture_loop(&mut source, &cfg, &stop, &feed);
        });

        Ok(())
    }
}

/// Receive the next notification or panic after two seconds
pub async fn next_notification(rx: &mut UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("notification channel closed")
}

/// Skip notifications until one matches the predicate, or panic after two
/// seconds
pub async fn wait_for(
    rx: &mut UnboundedReceiver<Notification>,
    mut pred: impl FnMut(&Notification) -> bool,
) -> Notification {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);

    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .expect("timed out waiting for matching notification");

        let notification = tokio::time::timeout(remaining, rx.recv())
            .await
            .expect("timed out waiting for matching notification")
            .expect("notification channel closed");

        if pred(&notification) {
            return notification;
        }
    }
}

/// Assert that no matching notification arrives within `window`
pub async fn assert_quiet(
    rx: &mut UnboundedReceiver<Notification>,
    window: Duration,
    pred: impl Fn(&Notification) -> bool,
) {
    let deadline = tokio::time::Instant::now() + window;

    loop {
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now()) else {
            return;
        };

        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(notification)) => {
                assert!(
                    !pred(&notification),
                    "unexpected notification: {notification:?}"
                );
            }
            Ok(None) | Err(_) => return,
        }
    }
}
