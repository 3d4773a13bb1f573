//! Single-utterance endpointing using RMS energy.
//!
//! A dictation session wants exactly one utterance: speech begins when chunk
//! energy crosses the threshold and ends after a configured run of silence,
//! or at the session cap for speakers who never pause.

use crate::config::CaptureConfig;

/// What the gate concluded after absorbing a chunk.
#[derive(Debug, PartialEq)]
pub enum GateOutcome {
    /// Still waiting for speech to start.
    WaitingForSpeech,
    /// Inside an utterance; keep feeding chunks.
    Capturing,
    /// The utterance is complete; the gate is spent.
    Utterance(Vec<f32>),
    /// Speech was too short to count; the gate reset to waiting.
    TooShort,
}

/// Energy-gated collector for one utterance.
///
/// Feed it capture chunks in order; once it yields
/// [`GateOutcome::Utterance`] it must not be fed again.
pub struct UtteranceGate {
    threshold: f32,
    silence_chunks_to_end: u32,
    min_speech_samples: usize,
    max_samples: usize,
    buffer: Vec<f32>,
    in_speech: bool,
    silence_run: u32,
}

/// Nominal chunk duration used to convert the silence window to a chunk
/// count. Capture chunk sizes vary by device; this only needs to be the
/// right order of magnitude.
const CHUNK_MS: u32 = 32;

impl UtteranceGate {
    /// Create a gate for one utterance at the given sample rate.
    pub fn new(config: &CaptureConfig, sample_rate: u32) -> Self {
        let silence_chunks_to_end = (config.min_silence_ms / CHUNK_MS).max(1);
        let min_speech_samples =
            config.min_speech_ms as usize * sample_rate as usize / 1000;
        let max_samples = config.max_utterance_secs as usize * sample_rate as usize;

        Self {
            threshold: config.threshold,
            silence_chunks_to_end,
            min_speech_samples,
            max_samples,
            buffer: Vec::new(),
            in_speech: false,
            silence_run: 0,
        }
    }

    /// Absorb one capture chunk.
    pub fn push(&mut self, chunk: &[f32]) -> GateOutcome {
        let is_speech = rms_energy(chunk) > self.threshold;

        if is_speech {
            if !self.in_speech {
                self.in_speech = true;
                self.buffer.clear();
            }
            self.silence_run = 0;
            self.buffer.extend_from_slice(chunk);
        } else if self.in_speech {
            // Keep trailing silence inside the tolerance window so the
            // utterance is not clipped.
            self.silence_run += 1;
            self.buffer.extend_from_slice(chunk);

            if self.silence_run >= self.silence_chunks_to_end {
                self.in_speech = false;
                self.silence_run = 0;
                if self.buffer.len() >= self.min_speech_samples {
                    return GateOutcome::Utterance(std::mem::take(&mut self.buffer));
                }
                self.buffer.clear();
                return GateOutcome::TooShort;
            }
        } else {
            return GateOutcome::WaitingForSpeech;
        }

        if self.buffer.len() >= self.max_samples {
            // Session cap: end the utterance even if the speaker never paused.
            self.in_speech = false;
            return GateOutcome::Utterance(std::mem::take(&mut self.buffer));
        }

        GateOutcome::Capturing
    }
}

/// RMS energy of a sample chunk.
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
