//! Speech capture and playback capabilities.
//!
//! Both directions are capability traits so hosts can inject the platform
//! implementations and tests can substitute fakes. Production
//! implementations: [`VoiceRecognizer`] (cpal microphone + energy
//! endpointing + Parakeet STT) and [`Speaker`] (OpenAI-compatible speech
//! server + cpal playback).

pub mod capture;
pub mod endpointing;
pub mod recognizer;
pub mod stt;
pub mod synthesis;

pub use capture::Microphone;
pub use endpointing::UtteranceGate;
pub use recognizer::VoiceRecognizer;
pub use stt::SttEngine;
pub use synthesis::{CpalSink, PlaybackSink, Speaker, SpeechServerClient};

use crate::error::Result;
use async_trait::async_trait;

/// Captures a single utterance from the microphone and returns its transcript.
///
/// One call is one recognition session: it ends on the first complete
/// utterance (or the session cap) and is not reusable mid-flight. Final
/// results only; there is no interim-transcript surface.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Record one utterance and transcribe it.
    ///
    /// # Errors
    ///
    /// Returns an error if no microphone is available, nothing was spoken
    /// before the session cap, or transcription fails. Callers are expected
    /// to log and carry on; dictation failures are never fatal.
    async fn capture_utterance(&self) -> Result<String>;
}

/// Speaks text aloud, one utterance at a time.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Begin speaking `text`.
    ///
    /// If an utterance is already playing the request is dropped (logged,
    /// not queued) and the call still succeeds. Playback itself runs in the
    /// background; the call returns once the utterance is dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails before playback starts.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Cancel any active or pending playback immediately.
    ///
    /// The speaking flag is forced false without waiting for the playback
    /// task to wind down.
    fn stop(&self);

    /// Whether an utterance is currently playing.
    fn is_speaking(&self) -> bool;
}
