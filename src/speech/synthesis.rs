//! Speech synthesis via an OpenAI-compatible speech server, played back
//! through cpal.
//!
//! The server does the voice work; this module fetches one WAV per
//! utterance and owns the queue-of-one playback rule: a new request while
//! an utterance is playing is dropped, and `stop` cancels playback
//! immediately.

use crate::config::{AudioConfig, SynthesisConfig};
use crate::error::{ChatError, Result};
use crate::speech::SpeechOutput;
use async_trait::async_trait;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// HTTP client for an OpenAI-compatible `/v1/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct SpeechServerClient {
    http: reqwest::Client,
    base_url: String,
    voice: String,
}

impl SpeechServerClient {
    /// Create a client for the configured speech server.
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.server_url.clone(),
            voice: config.voice.clone(),
        }
    }

    /// Synthesize `text` and return decoded mono samples plus their rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers outside the
    /// success range, or the WAV body cannot be decoded.
    pub async fn synthesize(&self, text: &str) -> Result<(Vec<f32>, u32)> {
        let url = format!(
            "{}/v1/audio/speech",
            self.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "input": text,
            "voice": self.voice,
            "response_format": "wav",
        });

        debug!("synthesizing {} chars via {url}", text.len());
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Synthesis(format!("speech server request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Synthesis(format!(
                "speech server returned {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Synthesis(format!("speech server read failed: {e}")))?;

        decode_wav(&bytes)
    }
}

/// Decode a WAV body into mono f32 samples.
fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes))
        .map_err(|e| ChatError::Synthesis(format!("invalid WAV response: {e}")))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ChatError::Synthesis(format!("WAV decode failed: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| ChatError::Synthesis(format!("WAV decode failed: {e}")))?
        }
    };

    let samples = if spec.channels > 1 {
        let ch = spec.channels as usize;
        interleaved
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    } else {
        interleaved
    };

    Ok((samples, spec.sample_rate))
}

/// Renders synthesized samples to an output.
///
/// Narrow seam between the utterance bookkeeping in [`Speaker`] and the
/// audio device, so the busy-guard and stop semantics are testable without
/// one. `play` blocks until the samples finish or `cancel` fires.
pub trait PlaybackSink: Send + Sync {
    /// Play `samples` at `sample_rate`, returning when done or cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the output stream cannot be created or started.
    fn play(&self, samples: &[f32], sample_rate: u32, cancel: &CancellationToken) -> Result<()>;
}

/// Playback through the system speakers via cpal.
pub struct CpalSink {
    device: cpal::Device,
}

impl CpalSink {
    /// Open the configured (or default) output device.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available.
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let device = resolve_output_device(config.output_device.as_deref())?;
        Ok(Self { device })
    }

    /// List available output devices.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let devices = cpal::default_host()
            .output_devices()
            .map_err(|e| ChatError::Audio(format!("cannot enumerate devices: {e}")))?;
        Ok(devices
            .filter_map(|d| d.description().ok().map(|desc| desc.name().to_owned()))
            .collect())
    }
}

/// Look up an output device by name, or take the system default.
fn resolve_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| ChatError::Audio(format!("cannot enumerate devices: {e}")))?
            .find(|d| d.description().is_ok_and(|desc| desc.name() == name))
            .ok_or_else(|| ChatError::Audio(format!("output device '{name}' not found"))),
        None => host
            .default_output_device()
            .ok_or_else(|| ChatError::Audio("no default output device".into())),
    }
}

impl PlaybackSink for CpalSink {
    fn play(&self, samples: &[f32], sample_rate: u32, cancel: &CancellationToken) -> Result<()> {
        let stream_config = StreamConfig {
            channels: 1,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        // The audio callback owns the cursor; only `finished` crosses back.
        let queued: Arc<[f32]> = samples.into();
        let finished = Arc::new(AtomicBool::new(false));
        let finished_cb = Arc::clone(&finished);
        let mut position = 0usize;

        let stream = self
            .device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        if let Some(next) = queued.get(position) {
                            *sample = *next;
                            position += 1;
                        } else {
                            *sample = 0.0;
                            finished_cb.store(true, Ordering::Relaxed);
                        }
                    }
                },
                move |err| {
                    warn!("audio output stream error: {err}");
                },
                None,
            )
            .map_err(|e| ChatError::Audio(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| ChatError::Audio(format!("failed to start output stream: {e}")))?;

        while !cancel.is_cancelled() && !finished.load(Ordering::Relaxed) {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        drop(stream);
        Ok(())
    }
}

/// Production [`SpeechOutput`]: server-side synthesis, local playback, at
/// most one utterance at a time.
pub struct Speaker {
    synth: SpeechServerClient,
    sink: Arc<dyn PlaybackSink>,
    speaking: Arc<AtomicBool>,
    active: Mutex<CancellationToken>,
}

impl Speaker {
    /// Create a speaker that plays through the given sink.
    pub fn new(config: &SynthesisConfig, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            synth: SpeechServerClient::new(config),
            sink,
            speaking: Arc::new(AtomicBool::new(false)),
            active: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a speaker playing through the system speakers.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available.
    pub fn with_default_sink(config: &SynthesisConfig, audio: &AudioConfig) -> Result<Self> {
        let sink = Arc::new(CpalSink::new(audio)?);
        Ok(Self::new(config, sink))
    }
}

#[async_trait]
impl SpeechOutput for Speaker {
    async fn speak(&self, text: &str) -> Result<()> {
        // Single atomic swap doubles as the busy check and the flag set, so
        // two requests in the same tick cannot both pass the guard.
        if self.speaking.swap(true, Ordering::SeqCst) {
            warn!("already speaking, dropping utterance");
            return Ok(());
        }

        let (samples, sample_rate) = match self.synth.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                self.speaking.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            *active = cancel.clone();
        }

        let sink = Arc::clone(&self.sink);
        let speaking = Arc::clone(&self.speaking);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = sink.play(&samples, sample_rate, &cancel) {
                warn!("speech playback failed: {e}");
            }
            // A cancelled utterance had its flag cleared by stop(); storing
            // here again could stomp a newer utterance's flag.
            if !cancel.is_cancelled() {
                speaking.store(false, Ordering::SeqCst);
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if let Ok(active) = self.active.lock() {
            active.cancel();
        }
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}
