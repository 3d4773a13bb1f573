//! Configuration types for the chat client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the chat client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Remote verdict endpoint settings.
    pub verdict: VerdictConfig,
    /// Voice mode settings.
    pub voice: VoiceConfig,
    /// Audio capture/playback settings.
    pub audio: AudioConfig,
    /// Utterance endpointing settings.
    pub capture: CaptureConfig,
    /// Speech-to-text settings.
    pub stt: SttConfig,
    /// Speech synthesis settings.
    pub synthesis: SynthesisConfig,
    /// Model management settings.
    pub models: ModelConfig,
}

/// Remote verdict endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// URL of the analysis endpoint.
    pub endpoint_url: String,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://cmr-1.onrender.com/run-flow".to_owned(),
        }
    }
}

/// Voice mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether voice input and output are wired up at all.
    ///
    /// When `false` the client is keyboard-only and none of the audio,
    /// capture, stt, or synthesis sections are touched.
    pub enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

/// Audio I/O configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz after downsampling.
    pub input_sample_rate: u32,
    /// Input device name (None = system default).
    pub input_device: Option<String>,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16_000,
            input_device: None,
            output_device: None,
        }
    }
}

/// Utterance endpointing configuration.
///
/// A dictation session records exactly one utterance: speech starts when RMS
/// energy crosses `threshold` and ends after `min_silence_ms` of silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// RMS energy threshold for speech detection.
    ///
    /// Typical values for f32 samples in \[-1, 1\]:
    ///   - 0.005: very sensitive (picks up quiet speech and some noise)
    ///   - 0.01:  normal sensitivity (default, good for most environments)
    ///   - 0.02:  reduced sensitivity (noisy environments)
    pub threshold: f32,
    /// Silence duration in ms that ends the utterance.
    pub min_silence_ms: u32,
    /// Minimum speech duration in ms for a valid utterance.
    pub min_speech_ms: u32,
    /// Hard cap on one dictation session in seconds.
    pub max_utterance_secs: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            min_silence_ms: 1200,
            min_speech_ms: 300,
            max_utterance_secs: 15,
        }
    }
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// HuggingFace model ID for the STT model.
    pub model_id: String,
    /// BCP-47 language tag the recognizer is run for.
    ///
    /// Parakeet TDT detects language automatically; the tag is recorded in
    /// logs so sessions can be correlated with the configured locale.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            // The ONNX-converted repo; the original NVIDIA repo only has .nemo format.
            model_id: "istupakov/parakeet-tdt-0.6b-v3-onnx".to_owned(),
            language: "en-US".to_owned(),
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Base URL of an OpenAI-compatible speech server.
    pub server_url: String,
    /// Voice identifier passed to the server.
    pub voice: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            // kokoro-fastapi's default port.
            server_url: "http://localhost:8880".to_owned(),
            voice: "af_heart".to_owned(),
        }
    }
}

/// Model management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory for downloaded model files.
    pub cache_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("newshound")
}

impl ChatConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ChatError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ChatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/newshound/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/newshound-config"))
            .join("newshound")
            .join("config.toml")
    }
}
