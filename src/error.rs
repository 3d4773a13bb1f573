//! Error types for the chat client.

/// Top-level error type for the chat client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Audio device or stream error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text capture or transcription error.
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Text-to-speech synthesis or playback error.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Remote verdict endpoint error.
    #[error("verdict error: {0}")]
    Verdict(#[from] crate::verdict::VerdictError),

    /// Model download or loading error.
    #[error("model error: {0}")]
    Model(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ChatError>;
