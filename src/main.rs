use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use retell::audio::{AudioCapture, AudioPlayback, rms_energy};
use retell::enhance::OpenAiEnhancer;
use retell::pipeline::{MicCaptureSpawner, Notification, PipelineBuilder, PipelineHandle, SpeakTarget};
use retell::stt::WhisperTranscriber;
use retell::tts::{ApiSpeaker, TextToSpeech};
use retell::Config;

/// Retell - voice transcript desk with AI enhancement
#[derive(Parser)]
#[command(name = "retell", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; the console stays quiet by default
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,retell=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
            Command::Setup => retell::setup::run_setup(),
        };
    }

    run_desk().await
}

/// Run the transcript desk with the console front-end
async fn run_desk() -> anyhow::Result<()> {
    let config = Config::load();

    let mut builder = PipelineBuilder::new(
        config.capture.clone(),
        Box::new(MicCaptureSpawner::new()),
    );

    if let Some(key) = config.api_keys.openai.clone() {
        let transcriber =
            WhisperTranscriber::new(SecretString::from(key.clone()), config.stt.model.clone())?;
        builder = builder.transcriber(Arc::new(transcriber));

        let enhancer =
            OpenAiEnhancer::new(SecretString::from(key.clone()), config.enhance.model.clone())?;
        builder = builder.enhancer(Arc::new(enhancer));

        match AudioPlayback::open(config.tts.volume) {
            Ok(playback) => {
                let tts = TextToSpeech::new(
                    SecretString::from(key),
                    config.tts.model.clone(),
                    config.tts.voice.clone(),
                    config.tts.speed,
                )?;
                builder = builder.speaker(Arc::new(ApiSpeaker::new(tts, playback)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "no playback device, speak commands disabled");
            }
        }
    }

    let (controller, handle, mut notifications) = builder.build();
    let controller_task = tokio::spawn(controller.run());

    println!("Retell - voice transcript desk");
    println!("Commands: start, stop, enhance, speak, speak enhanced, clear, quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if dispatch(&handle, line.trim()) => {}
                    _ => break,
                }
            }
            Some(notification) = notifications.recv() => {
                render(&notification);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    handle.shutdown();
    drop(handle);
    controller_task.await?;

    println!("Bye.");
    Ok(())
}

/// Forward one console command; returns false to quit
fn dispatch(handle: &PipelineHandle, line: &str) -> bool {
    match line.to_lowercase().as_str() {
        "" => {}
        "start" | "s" => handle.start_listening(),
        "stop" => handle.stop_listening(),
        "enhance" | "e" => handle.enhance(),
        "speak" => handle.speak(SpeakTarget::Transcript),
        "speak enhanced" | "se" => handle.speak(SpeakTarget::Enhanced),
        "clear" => handle.clear(),
        "help" | "?" => {
            println!("Commands: start, stop, enhance, speak, speak enhanced, clear, quit");
        }
        "quit" | "exit" | "q" => return false,
        other => println!("Unknown command: {other} (try `help`)"),
    }
    true
}

/// Print one notification
fn render(notification: &Notification) {
    match notification {
        Notification::Transcript(text) => {
            println!("── transcript ─────────────────────────");
            println!("{text}");
        }
        Notification::Enhanced(text) => {
            println!("── enhanced ───────────────────────────");
            println!("{text}");
        }
        Notification::Status(message) => println!("[{message}]"),
        Notification::Listening(true) => println!("[recording]"),
        Notification::Listening(false) => println!("[idle]"),
        Notification::EnhanceBusy(busy) => {
            if *busy {
                println!("[enhance: working...]");
            }
        }
    }
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::open()?;
    capture.start()?;
    println!("Sample rate: {} Hz", retell::audio::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::open(0.9)?;

    // 2 seconds of 440Hz at the 24kHz playback rate
    let sample_rate = 24_000_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples...", samples.len());
    tokio::task::spawn_blocking(move || playback.play_blocking(&samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS synthesis and playback
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load();
    let key = config
        .api_keys
        .openai
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY required for TTS test"))?;

    let tts = TextToSpeech::new(
        SecretString::from(key),
        config.tts.model.clone(),
        config.tts.voice.clone(),
        config.tts.speed,
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let playback = AudioPlayback::open(config.tts.volume)?;
    tokio::task::spawn_blocking(move || playback.play_mp3_blocking(&mp3_data)).await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
