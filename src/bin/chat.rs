//! Terminal chat host for newshound.
//!
//! Line-oriented front end: typed lines are submitted for analysis, turns
//! are rendered as they append, and with voice enabled `:voice` dictates
//! into the input buffer. Diagnostics go to stderr so the chat stays clean.

use newshound::speech::{CpalSink, Microphone, Speaker, VoiceRecognizer};
use newshound::transcript::Sender;
use newshound::{ChatConfig, ChatView, VerdictClient};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Suppress noisy dependency logs by default; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("newshound=info,hf_hub=warn,ort=warn")),
        )
        .init();

    // Optional single argument: path to a TOML config file.
    let config = match std::env::args().nth(1) {
        Some(path) => ChatConfig::from_file(Path::new(&path))?,
        None => {
            let path = ChatConfig::default_config_path();
            if path.is_file() {
                ChatConfig::from_file(&path)?
            } else {
                ChatConfig::default()
            }
        }
    };

    let (turn_tx, mut turn_rx) = mpsc::unbounded_channel();
    let mut view = ChatView::new(VerdictClient::new(&config.verdict)).with_turn_events(turn_tx);

    if config.voice.enabled {
        match VoiceRecognizer::new(&config) {
            Ok(recognizer) => {
                if let Err(e) = recognizer.preload().await {
                    warn!("STT model not preloaded, will retry on first dictation: {e}");
                }
                view = view.with_speech_input(Arc::new(recognizer));
            }
            Err(e) => warn!("voice input unavailable: {e}"),
        }
        match Speaker::with_default_sink(&config.synthesis, &config.audio) {
            Ok(speaker) => view = view.with_speech_output(Arc::new(speaker)),
            Err(e) => warn!("voice output unavailable: {e}"),
        }
    }

    println!("Newshound v{}", env!("CARGO_PKG_VERSION"));
    println!("Share any news and I'll help you verify its authenticity.");
    if config.voice.enabled {
        println!("Commands: :voice dictate, :stop stop playback, :devices list audio, :quit exit.\n");
    } else {
        println!("Commands: :quit exit.\n");
    }

    // Render turns as they append; out-of-order replies land as they resolve.
    tokio::spawn(async move {
        while let Some(turn) = turn_rx.recv().await {
            let who = match turn.sender {
                Sender::User => "you",
                Sender::Bot => "hound",
            };
            println!("[{}] {}: {}", turn.timestamp, who, turn.text);
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" => break,
            ":stop" => view.stop_speaking(),
            ":devices" => list_devices(),
            ":voice" => {
                if let Err(e) = view.dictate().await {
                    warn!("dictation failed: {e}");
                } else if !view.input().is_empty() {
                    println!("(dictated) {} [press Enter to send]", view.input());
                }
            }
            "" => {
                // An empty line sends a dictated buffer; with nothing
                // buffered the submit guard makes it a no-op.
                let _ = view.submit();
            }
            _ => {
                view.set_input(line);
                let _ = view.submit();
            }
        }
    }

    Ok(())
}

fn list_devices() {
    match Microphone::list_input_devices() {
        Ok(names) => {
            println!("Input devices:");
            for name in names {
                println!("  - {name}");
            }
        }
        Err(e) => warn!("cannot list input devices: {e}"),
    }
    match CpalSink::list_output_devices() {
        Ok(names) => {
            println!("Output devices:");
            for name in names {
                println!("  - {name}");
            }
        }
        Err(e) => warn!("cannot list output devices: {e}"),
    }
}
