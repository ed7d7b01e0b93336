//! TOML configuration file loading
//!
//! Supports `~/.config/retell/config.toml` as a persistent config source.
//! All fields are optional: the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RetellConfigFile {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Utterance capture configuration
    #[serde(default)]
    pub capture: CaptureFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Transcript enhancement configuration
    #[serde(default)]
    pub enhance: EnhanceFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Utterance capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct CaptureFileConfig {
    /// Max seconds to wait for speech to start
    pub wait_timeout_secs: Option<f64>,

    /// Max seconds of a single utterance
    pub phrase_limit_secs: Option<f64>,

    /// Seconds of ambient noise sampled at startup
    pub calibration_secs: Option<f64>,

    /// Cap on concurrent in-flight recognition tasks
    pub max_in_flight_recognitions: Option<usize>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// STT model (e.g. "whisper-1")
    pub model: Option<String>,
}

/// Transcript enhancement configuration
#[derive(Debug, Default, Deserialize)]
pub struct EnhanceFileConfig {
    /// Chat model (e.g. "gpt-4")
    pub model: Option<String>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// Voice identifier (e.g. "alloy")
    pub voice: Option<String>,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: Option<f32>,

    /// Playback volume gain (0.0 to 1.0)
    pub volume: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `RetellConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
#[must_use]
pub fn load_config_file() -> RetellConfigFile {
    let Some(path) = config_file_path() else {
        return RetellConfigFile::default();
    };

    read_config_file(&path)
}

/// Read and parse a config file, falling back to defaults on any failure
pub(crate) fn read_config_file(path: &Path) -> RetellConfigFile {
    if !path.exists() {
        return RetellConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RetellConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RetellConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/retell/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("retell").join("config.toml"))
}
