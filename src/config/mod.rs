//! Configuration management for retell
//!
//! Layered loading with env > TOML file > default precedence. A missing
//! OpenAI credential is not fatal: the affected operations degrade to
//! rejected requests with a warning at startup.

pub mod file;

use std::time::Duration;

/// Retell configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Utterance capture settings
    pub capture: CaptureConfig,

    /// Speech-to-text settings
    pub stt: SttConfig,

    /// Transcript enhancement settings
    pub enhance: EnhanceConfig,

    /// Text-to-speech settings
    pub tts: TtsConfig,
}

/// API keys for external services
///
/// Held as plain strings here; each client wraps its copy in a
/// `secrecy::SecretString` at construction.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat completions, and TTS)
    pub openai: Option<String>,
}

/// Utterance capture settings
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Max time to wait for speech to start before looping
    pub wait_timeout: Duration,

    /// Max length of a single utterance
    pub phrase_limit: Duration,

    /// Ambient-noise sampling window at startup
    pub calibration: Duration,

    /// Cap on concurrent in-flight recognition tasks
    pub max_in_flight_recognitions: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(1),
            phrase_limit: Duration::from_secs(5),
            calibration: Duration::from_secs(1),
            max_in_flight_recognitions: 4,
        }
    }
}

/// Speech-to-text settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// STT model identifier
    pub model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
        }
    }
}

/// Transcript enhancement settings
#[derive(Debug, Clone)]
pub struct EnhanceConfig {
    /// Chat model identifier
    pub model: String,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
        }
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// TTS model identifier
    pub model: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Playback volume gain (0.0 to 1.0)
    pub volume: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            volume: 0.9,
        }
    }
}

impl Config {
    /// Load configuration with env > TOML > default precedence
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY")
                .ok()
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty()),
        };

        if api_keys.openai.is_none() {
            tracing::warn!(
                "OPENAI_API_KEY not configured - transcription, enhancement, and TTS \
                 will reject requests until a key is set"
            );
        }

        let capture_defaults = CaptureConfig::default();
        let capture = CaptureConfig {
            wait_timeout: env_secs("RETELL_CAPTURE_TIMEOUT")
                .or_else(|| fc.capture.wait_timeout_secs.map(Duration::from_secs_f64))
                .unwrap_or(capture_defaults.wait_timeout),
            phrase_limit: env_secs("RETELL_PHRASE_LIMIT")
                .or_else(|| fc.capture.phrase_limit_secs.map(Duration::from_secs_f64))
                .unwrap_or(capture_defaults.phrase_limit),
            calibration: fc
                .capture
                .calibration_secs
                .map(Duration::from_secs_f64)
                .unwrap_or(capture_defaults.calibration),
            max_in_flight_recognitions: fc
                .capture
                .max_in_flight_recognitions
                .filter(|&n| n > 0)
                .unwrap_or(capture_defaults.max_in_flight_recognitions),
        };

        let stt = SttConfig {
            model: std::env::var("RETELL_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or_else(|| SttConfig::default().model),
        };

        let enhance = EnhanceConfig {
            model: std::env::var("RETELL_ENHANCE_MODEL")
                .ok()
                .or(fc.enhance.model)
                .unwrap_or_else(|| EnhanceConfig::default().model),
        };

        let tts_defaults = TtsConfig::default();
        let tts = TtsConfig {
            model: std::env::var("RETELL_TTS_MODEL")
                .ok()
                .or(fc.tts.model)
                .unwrap_or(tts_defaults.model),
            voice: std::env::var("RETELL_TTS_VOICE")
                .ok()
                .or(fc.tts.voice)
                .unwrap_or(tts_defaults.voice),
            speed: env_parse("RETELL_TTS_SPEED")
                .or(fc.tts.speed)
                .unwrap_or(tts_defaults.speed),
            volume: env_parse("RETELL_TTS_VOLUME")
                .or(fc.tts.volume)
                .unwrap_or(tts_defaults.volume)
                .clamp(0.0, 1.0),
        };

        Self {
            api_keys,
            capture,
            stt,
            enhance,
            tts,
        }
    }
}

/// Parse an env var as fractional seconds
fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<f64>(name).map(Duration::from_secs_f64)
}

/// Parse an env var, ignoring unset or malformed values
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_defaults_match_documented_values() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.wait_timeout, Duration::from_secs(1));
        assert_eq!(capture.phrase_limit, Duration::from_secs(5));
        assert_eq!(capture.calibration, Duration::from_secs(1));
        assert_eq!(capture.max_in_flight_recognitions, 4);
    }

    #[test]
    fn tts_defaults() {
        let tts = TtsConfig::default();
        assert_eq!(tts.model, "tts-1");
        assert_eq!(tts.voice, "alloy");
        assert!((tts.volume - 0.9).abs() < f32::EPSILON);
    }
}
