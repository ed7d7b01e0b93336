//! Interactive first-run setup wizard (`retell setup`)

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, CaptureFileConfig, EnhanceFileConfig, RetellConfigFile, SttFileConfig,
    TtsFileConfig,
};

/// Voices offered by the TTS API
const VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or the config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Retell Setup\n");

    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/retell/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. OpenAI API key (Whisper + chat + TTS)
    let existing_key = existing.api_keys.openai.as_deref();
    let masked = existing_key.map(|k| {
        if k.len() > 8 {
            format!("{}...{}", &k[..4], &k[k.len() - 4..])
        } else {
            "****".to_string()
        }
    });

    let prompt = masked.as_ref().map_or_else(
        || "OpenAI API key (OPENAI_API_KEY)".to_string(),
        |m| format!("OpenAI API key (current: {m}, leave blank to keep)"),
    );

    let key_input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let openai = if key_input.is_empty() {
        existing_key.map(str::to_string)
    } else {
        Some(key_input)
    };

    // 2. Capture timing
    let wait_timeout: f64 = Input::new()
        .with_prompt("Seconds to wait for speech before re-listening")
        .default(existing.capture.wait_timeout_secs.unwrap_or(1.0))
        .interact_text()?;

    let phrase_limit: f64 = Input::new()
        .with_prompt("Max seconds per utterance")
        .default(existing.capture.phrase_limit_secs.unwrap_or(5.0))
        .interact_text()?;

    // 3. Playback voice
    let default_voice = existing
        .tts
        .voice
        .as_deref()
        .and_then(|v| VOICES.iter().position(|&known| known == v))
        .unwrap_or(0);

    let voice_idx = Select::new()
        .with_prompt("Playback voice")
        .items(VOICES)
        .default(default_voice)
        .interact()?;

    let speed: f32 = Input::new()
        .with_prompt("Playback speed (0.25 to 4.0)")
        .default(existing.tts.speed.unwrap_or(1.0))
        .interact_text()?;

    let volume: f32 = Input::new()
        .with_prompt("Playback volume (0.0 to 1.0)")
        .default(existing.tts.volume.unwrap_or(0.9))
        .interact_text()?;

    // 4. Build and write config
    let config_file = RetellConfigFile {
        api_keys: ApiKeysFileConfig { openai },
        capture: CaptureFileConfig {
            wait_timeout_secs: Some(wait_timeout),
            phrase_limit_secs: Some(phrase_limit),
            calibration_secs: existing.capture.calibration_secs,
            max_in_flight_recognitions: existing.capture.max_in_flight_recognitions,
        },
        stt: SttFileConfig {
            model: existing.stt.model.or_else(|| Some("whisper-1".to_string())),
        },
        enhance: EnhanceFileConfig {
            model: existing.enhance.model.or_else(|| Some("gpt-4".to_string())),
        },
        tts: TtsFileConfig {
            model: existing.tts.model.or_else(|| Some("tts-1".to_string())),
            voice: Some(VOICES[voice_idx].to_string()),
            speed: Some(speed),
            volume: Some(volume.clamp(0.0, 1.0)),
        },
    };

    let overwrite = !config_path.exists()
        || Confirm::new()
            .with_prompt("Overwrite existing config?")
            .default(true)
            .interact()?;

    if overwrite {
        write_config(&config_path, &config_file)?;
        println!("\nConfig written to {}", config_path.display());
    } else {
        println!("\nConfig left untouched");
    }

    println!("\nSetup complete! Run `retell -v` to start.");

    Ok(())
}

/// Serialize and write the config file
fn write_config(path: &PathBuf, config: &RetellConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, serialize_config(config))?;

    Ok(())
}

/// Serialize config to a readable TOML string
fn serialize_config(config: &RetellConfigFile) -> String {
    let mut out = String::new();

    if let Some(ref key) = config.api_keys.openai {
        out.push_str("[api_keys]\n");
        out.push_str(&format!("openai = \"{key}\"\n\n"));
    }

    out.push_str("[capture]\n");
    if let Some(secs) = config.capture.wait_timeout_secs {
        out.push_str(&format!("wait_timeout_secs = {secs}\n"));
    }
    if let Some(secs) = config.capture.phrase_limit_secs {
        out.push_str(&format!("phrase_limit_secs = {secs}\n"));
    }
    if let Some(secs) = config.capture.calibration_secs {
        out.push_str(&format!("calibration_secs = {secs}\n"));
    }
    if let Some(n) = config.capture.max_in_flight_recognitions {
        out.push_str(&format!("max_in_flight_recognitions = {n}\n"));
    }
    out.push('\n');

    if let Some(ref model) = config.stt.model {
        out.push_str("[stt]\n");
        out.push_str(&format!("model = \"{model}\"\n\n"));
    }

    if let Some(ref model) = config.enhance.model {
        out.push_str("[enhance]\n");
        out.push_str(&format!("model = \"{model}\"\n\n"));
    }

    out.push_str("[tts]\n");
    if let Some(ref model) = config.tts.model {
        out.push_str(&format!("model = \"{model}\"\n"));
    }
    if let Some(ref voice) = config.tts.voice {
        out.push_str(&format!("voice = \"{voice}\"\n"));
    }
    if let Some(speed) = config.tts.speed {
        out.push_str(&format!("speed = {speed}\n"));
    }
    if let Some(volume) = config.tts.volume {
        out.push_str(&format!("volume = {volume}\n"));
    }

    out
}
