//! One-shot voice dictation: microphone → endpointing → Parakeet.

use crate::config::{AudioConfig, CaptureConfig, ChatConfig};
use crate::error::{ChatError, Result};
use crate::speech::capture::Microphone;
use crate::speech::endpointing::{GateOutcome, UtteranceGate};
use crate::speech::stt::SttEngine;
use crate::speech::SpeechInput;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Trailing allowance on top of the utterance cap so the closing silence
/// window can still be observed.
const SESSION_GRACE_SECS: u64 = 2;

/// Production [`SpeechInput`]: records one utterance from the microphone and
/// transcribes it with the Parakeet engine.
///
/// Each [`capture_utterance`](SpeechInput::capture_utterance) call opens a
/// fresh capture session; there is no continuous listening.
pub struct VoiceRecognizer {
    audio: AudioConfig,
    capture: CaptureConfig,
    engine: Arc<Mutex<SttEngine>>,
}

impl VoiceRecognizer {
    /// Build a recognizer from config. The STT model loads lazily on the
    /// first dictation unless [`preload`](Self::preload) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cache cannot be prepared.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let engine = SttEngine::new(&config.stt, &config.models)?;
        Ok(Self {
            audio: config.audio.clone(),
            capture: config.capture.clone(),
            engine: Arc::new(Mutex::new(engine)),
        })
    }

    /// Download and load the STT model now instead of on first dictation.
    ///
    /// # Errors
    ///
    /// Returns an error if model download or loading fails.
    pub async fn preload(&self) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            engine
                .lock()
                .map_err(|_| ChatError::Recognition("engine lock poisoned".into()))?
                .ensure_loaded()
        })
        .await
        .map_err(|e| ChatError::Recognition(format!("preload task failed: {e}")))?
    }

    /// Record until the gate yields one utterance, or the session cap expires.
    async fn record_utterance(&self) -> Result<Vec<f32>> {
        let mut gate = UtteranceGate::new(&self.capture, self.audio.input_sample_rate);

        let (tx, mut rx) = mpsc::channel::<Vec<f32>>(64);
        let cancel = CancellationToken::new();
        let mic_cancel = cancel.clone();
        let audio = self.audio.clone();
        let mic_task = tokio::spawn(async move {
            match Microphone::new(&audio) {
                Ok(microphone) => {
                    if let Err(e) = microphone.run(tx, mic_cancel).await {
                        error!("microphone capture failed: {e}");
                    }
                }
                Err(e) => error!("cannot open microphone: {e}"),
            }
        });

        let listen_window =
            Duration::from_secs(u64::from(self.capture.max_utterance_secs) + SESSION_GRACE_SECS);
        let gathered = tokio::time::timeout(listen_window, async {
            while let Some(chunk) = rx.recv().await {
                if let GateOutcome::Utterance(samples) = gate.push(&chunk) {
                    return Some(samples);
                }
            }
            None
        })
        .await;

        cancel.cancel();
        let _ = mic_task.await;

        match gathered {
            Ok(Some(samples)) => Ok(samples),
            Ok(None) => Err(ChatError::Recognition(
                "capture stream ended before an utterance".into(),
            )),
            Err(_) => Err(ChatError::Recognition(
                "no utterance before the session cap".into(),
            )),
        }
    }
}

#[async_trait]
impl SpeechInput for VoiceRecognizer {
    async fn capture_utterance(&self) -> Result<String> {
        info!("dictation session started");
        let samples = self.record_utterance().await?;
        let sample_rate = self.audio.input_sample_rate;

        let engine = Arc::clone(&self.engine);
        let transcript = tokio::task::spawn_blocking(move || {
            engine
                .lock()
                .map_err(|_| ChatError::Recognition("engine lock poisoned".into()))?
                .transcribe(samples, sample_rate)
        })
        .await
        .map_err(|e| ChatError::Recognition(format!("transcription task failed: {e}")))??;

        info!("dictation session ended");
        Ok(transcript)
    }
}
