//! Microphone input for dictation sessions.
//!
//! Opens the cpal device at its native configuration for maximum
//! compatibility, then conditions the signal in software: interleaved
//! channels are averaged to mono and the stream is downsampled to the
//! configured capture rate.

use crate::config::AudioConfig;
use crate::error::{ChatError, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Microphone capture for one dictation session.
pub struct Microphone {
    device: cpal::Device,
    stream_config: StreamConfig,
    target_sample_rate: u32,
}

impl Microphone {
    /// Open the configured (or default) input device.
    ///
    /// # Errors
    ///
    /// Returns an error if no input device is available.
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let device = resolve_input_device(config.input_device.as_deref())?;
        let device_name = device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into());

        let native = device
            .default_input_config()
            .map_err(|e| ChatError::Audio(format!("no default input config: {e}")))?;
        let stream_config = StreamConfig {
            channels: native.channels(),
            sample_rate: native.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        info!(
            "capturing from '{device_name}': {}Hz x{} -> {}Hz mono",
            stream_config.sample_rate, stream_config.channels, config.input_sample_rate
        );

        Ok(Self {
            device,
            stream_config,
            target_sample_rate: config.input_sample_rate,
        })
    }

    /// The sample rate chunks are delivered at.
    pub fn sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Stream conditioned sample chunks to `tx` until cancelled.
    ///
    /// Chunks are mono f32 at [`Self::sample_rate`]. The audio callback never
    /// blocks; chunks are dropped if the receiver falls behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the input stream cannot be created or started.
    pub async fn run(&self, tx: mpsc::Sender<Vec<f32>>, cancel: CancellationToken) -> Result<()> {
        let native_rate = self.stream_config.sample_rate;
        let native_channels = self.stream_config.channels;
        let target_rate = self.target_sample_rate;

        let stream = self
            .device
            .build_input_stream(
                &self.stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let samples = condition(data, native_channels, native_rate, target_rate);
                    if tx.try_send(samples).is_err() {
                        debug!("capture channel full, dropping chunk");
                    }
                },
                move |err| {
                    error!("audio input stream error: {err}");
                },
                None,
            )
            .map_err(|e| ChatError::Audio(format!("failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| ChatError::Audio(format!("failed to start input stream: {e}")))?;

        // Hold the stream alive until the session ends.
        cancel.cancelled().await;
        drop(stream);
        debug!("capture session ended");
        Ok(())
    }

    /// List available input devices.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_input_devices() -> Result<Vec<String>> {
        let devices = cpal::default_host()
            .input_devices()
            .map_err(|e| ChatError::Audio(format!("cannot enumerate devices: {e}")))?;
        Ok(devices
            .filter_map(|d| d.description().ok().map(|desc| desc.name().to_owned()))
            .collect())
    }
}

/// Look up an input device by name, or take the system default.
fn resolve_input_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| ChatError::Audio(format!("cannot enumerate devices: {e}")))?
            .find(|d| d.description().is_ok_and(|desc| desc.name() == name))
            .ok_or_else(|| ChatError::Audio(format!("input device '{name}' not found"))),
        None => host
            .default_input_device()
            .ok_or_else(|| ChatError::Audio("no default input device".into())),
    }
}

/// Average interleaved channels to mono and resample to `target_rate`.
fn condition(data: &[f32], channels: u16, native_rate: u32, target_rate: u32) -> Vec<f32> {
    let mono: Vec<f32> = if channels > 1 {
        let ch = channels as usize;
        data.chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    } else {
        data.to_vec()
    };

    if native_rate == target_rate || mono.is_empty() {
        return mono;
    }

    // Linear interpolation is enough for speech: its energy sits below 8kHz,
    // so 48kHz -> 16kHz needs no anti-alias filter.
    let ratio = f64::from(native_rate) / f64::from(target_rate);
    let out_len = (mono.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = pos - idx as f64;
        let sample = if idx + 1 < mono.len() {
            f64::from(mono[idx]) * (1.0 - frac) + f64::from(mono[idx + 1]) * frac
        } else {
            f64::from(mono[idx.min(mono.len() - 1)])
        };
        output.push(sample as f32);
    }
    output
}
