//! Newshound: voice-enabled chat client for news verification.
//!
//! This crate wires a chat transcript to a remote analysis endpoint:
//! Input (keyboard or microphone) → verdict request → transcript → speech output
//!
//! # Architecture
//!
//! The client is built from small, independently testable pieces:
//! - **Transcript**: append-only conversation log
//! - **Verdict client**: single-endpoint HTTP caller via `reqwest`
//! - **Speech**: capture (cpal + energy endpointing + Parakeet STT) and
//!   playback (speech server + cpal) behind capability traits so hosts and
//!   tests can substitute implementations
//! - **Chat view**: owns the input buffer and orchestrates submissions

pub mod config;
pub mod error;
pub mod speech;
pub mod transcript;
pub mod verdict;
pub mod view;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use transcript::{Sender, Transcript, Turn};
pub use verdict::VerdictClient;
pub use view::ChatView;
