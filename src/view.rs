//! Chat view: input buffer, transcript ownership, and submit orchestration.
//!
//! The view appends the user turn synchronously, then resolves the verdict
//! on a spawned task so further input is never blocked. Overlapping
//! submissions are independent in-flight requests; their bot turns land in
//! whichever order the endpoint answers.

use crate::speech::{SpeechInput, SpeechOutput};
use crate::transcript::{Transcript, Turn};
use crate::verdict::{self, VerdictClient};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// The chat surface: transcript, input buffer, and attached capabilities.
///
/// Voice behavior is keyed on which capabilities are attached; a keyboard-only
/// view simply has none.
pub struct ChatView {
    transcript: Arc<Mutex<Transcript>>,
    input: String,
    client: Arc<VerdictClient>,
    speech_out: Option<Arc<dyn SpeechOutput>>,
    speech_in: Option<Arc<dyn SpeechInput>>,
    turn_tx: Option<mpsc::UnboundedSender<Turn>>,
}

impl ChatView {
    /// Create a keyboard-only view over the given client.
    pub fn new(client: VerdictClient) -> Self {
        Self {
            transcript: Arc::new(Mutex::new(Transcript::new())),
            input: String::new(),
            client: Arc::new(client),
            speech_out: None,
            speech_in: None,
            turn_tx: None,
        }
    }

    /// Attach a speech-output capability; bot turns will be spoken.
    #[must_use]
    pub fn with_speech_output(mut self, speech: Arc<dyn SpeechOutput>) -> Self {
        self.speech_out = Some(speech);
        self
    }

    /// Attach a speech-input capability; [`dictate`](Self::dictate) becomes available.
    #[must_use]
    pub fn with_speech_input(mut self, speech: Arc<dyn SpeechInput>) -> Self {
        self.speech_in = Some(speech);
        self
    }

    /// Attach a channel that receives every appended turn, in append order.
    #[must_use]
    pub fn with_turn_events(mut self, tx: mpsc::UnboundedSender<Turn>) -> Self {
        self.turn_tx = Some(tx);
        self
    }

    /// Current input buffer contents.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Snapshot of the transcript, oldest turn first.
    pub fn turns(&self) -> Vec<Turn> {
        self.transcript
            .lock()
            .map(|t| t.turns().to_vec())
            .unwrap_or_default()
    }

    /// Submit the input buffer for analysis.
    ///
    /// Empty or whitespace-only input is a no-op: nothing is appended, the
    /// buffer is untouched, and no task is spawned. Otherwise the user turn
    /// is appended immediately, the buffer is cleared, and the returned
    /// handle resolves once the bot turn has been appended (and, with a
    /// speech output attached, its utterance dispatched).
    pub fn submit(&mut self) -> Option<JoinHandle<()>> {
        if self.input.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        append_turn(&self.transcript, &self.turn_tx, Turn::user(&text));

        let client = Arc::clone(&self.client);
        let transcript = Arc::clone(&self.transcript);
        let turn_tx = self.turn_tx.clone();
        let speech_out = self.speech_out.clone();

        Some(tokio::spawn(async move {
            let reply = verdict::reply_text(client.analyze(&text).await);
            append_turn(&transcript, &turn_tx, Turn::bot(&reply));

            if let Some(speech) = speech_out
                && let Err(e) = speech.speak(&reply).await
            {
                warn!("speech output failed: {e}");
            }
        }))
    }

    /// Dictate into the input buffer.
    ///
    /// On success the transcript of the captured utterance REPLACES the
    /// buffer. On failure (or with no speech input attached) the buffer is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns the capture or transcription error; callers log it, since
    /// dictation has no user-visible error surface.
    pub async fn dictate(&mut self) -> crate::error::Result<()> {
        let Some(speech) = self.speech_in.clone() else {
            warn!("dictation requested without a speech input attached");
            return Ok(());
        };

        let transcript = speech.capture_utterance().await?;
        if !transcript.is_empty() {
            self.input = transcript;
        }
        Ok(())
    }

    /// Stop any active speech playback.
    pub fn stop_speaking(&self) {
        if let Some(speech) = &self.speech_out {
            speech.stop();
        }
    }

    /// Whether a bot utterance is currently playing.
    pub fn is_speaking(&self) -> bool {
        self.speech_out
            .as_ref()
            .is_some_and(|s| s.is_speaking())
    }
}

/// Append to the shared transcript and forward to the event channel.
fn append_turn(
    transcript: &Arc<Mutex<Transcript>>,
    turn_tx: &Option<mpsc::UnboundedSender<Turn>>,
    turn: Turn,
) {
    if let Ok(mut t) = transcript.lock() {
        t.append(turn.clone());
    }
    if let Some(tx) = turn_tx {
        let _ = tx.send(turn);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::config::VerdictConfig;
    use crate::error::{ChatError, Result};
    use crate::transcript::Sender;
    use crate::verdict::{MISSING_VERDICT_REPLY, REQUEST_FAILED_REPLY};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn view_for(server: &MockServer) -> ChatView {
        let config = VerdictConfig {
            endpoint_url: format!("{}/run-flow", server.uri()),
        };
        ChatView::new(VerdictClient::new(&config))
    }

    async fn server_answering(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run-flow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    /// Speech output that records utterances instead of playing them.
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
        speaking: AtomicBool,
    }

    impl RecordingSpeech {
        fn new() -> Self {
            Self {
                spoken: Mutex::new(Vec::new()),
                speaking: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SpeechOutput for RecordingSpeech {
        async fn speak(&self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_owned());
            Ok(())
        }

        fn stop(&self) {
            self.speaking.store(false, Ordering::SeqCst);
        }

        fn is_speaking(&self) -> bool {
            self.speaking.load(Ordering::SeqCst)
        }
    }

    /// Speech input with a canned (or failing) transcript.
    struct CannedSpeech {
        transcript: Option<String>,
    }

    #[async_trait]
    impl SpeechInput for CannedSpeech {
        async fn capture_utterance(&self) -> Result<String> {
            self.transcript
                .clone()
                .ok_or_else(|| ChatError::Recognition("microphone unavailable".into()))
        }
    }

    #[tokio::test]
    async fn submit_appends_user_then_bot_turn() {
        let server = server_answering(serde_json::json!({"output": "Verified"})).await;
        let mut view = view_for(&server);

        view.set_input("moon landing was staged?");
        let handle = view.submit().expect("non-empty input should submit");

        // User turn is appended synchronously, before resolution.
        let turns = view.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].sender, Sender::User);
        assert_eq!(turns[0].text, "moon landing was staged?");
        assert!(view.input().is_empty());

        handle.await.unwrap();
        let turns = view.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].sender, Sender::Bot);
        assert_eq!(turns[1].text, "Verified");
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let server = server_answering(serde_json::json!({"output": "unused"})).await;
        let mut view = view_for(&server);

        assert!(view.submit().is_none());

        view.set_input("   \t ");
        assert!(view.submit().is_none());
        assert_eq!(view.input(), "   \t ");
        assert!(view.turns().is_empty());
    }

    #[tokio::test]
    async fn missing_output_field_maps_to_fixed_reply() {
        let server = server_answering(serde_json::json!({"status": "ok"})).await;
        let mut view = view_for(&server);

        view.set_input("some claim");
        view.submit().unwrap().await.unwrap();

        assert_eq!(view.turns()[1].text, MISSING_VERDICT_REPLY);
    }

    #[tokio::test]
    async fn endpoint_failure_maps_to_generic_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run-flow"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let mut view = view_for(&server);

        view.set_input("some claim");
        view.submit().unwrap().await.unwrap();

        let turns = view.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, REQUEST_FAILED_REPLY);
    }

    #[tokio::test]
    async fn request_carries_claim_and_non_streaming_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run-flow"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "inputValue": "is the earth flat",
                "stream": false,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"output": "No."})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let mut view = view_for(&server);

        view.set_input("is the earth flat");
        view.submit().unwrap().await.unwrap();
        assert_eq!(view.turns()[1].text, "No.");
    }

    #[tokio::test]
    async fn overlapping_submissions_each_append_one_bot_turn() {
        let server = server_answering(serde_json::json!({"output": "Checked"})).await;
        let mut view = view_for(&server);

        view.set_input("first claim");
        let first = view.submit().unwrap();
        view.set_input("second claim");
        let second = view.submit().unwrap();

        // Both user turns land before either response.
        assert_eq!(view.turns().len(), 2);

        first.await.unwrap();
        second.await.unwrap();

        let turns = view.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(
            turns.iter().filter(|t| t.sender == Sender::Bot).count(),
            2
        );
    }

    #[tokio::test]
    async fn bot_reply_is_spoken_when_speech_is_attached() {
        let server = server_answering(serde_json::json!({"output": "Likely satire"})).await;
        let speech = Arc::new(RecordingSpeech::new());
        let mut view =
            view_for(&server).with_speech_output(Arc::clone(&speech) as Arc<dyn SpeechOutput>);

        view.set_input("birds are drones");
        view.submit().unwrap().await.unwrap();

        assert_eq!(
            speech.spoken.lock().unwrap().as_slice(),
            ["Likely satire".to_owned()]
        );
    }

    #[tokio::test]
    async fn turn_events_arrive_in_append_order() {
        let server = server_answering(serde_json::json!({"output": "Verified"})).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut view = view_for(&server).with_turn_events(tx);

        view.set_input("claim");
        view.submit().unwrap().await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.sender, Sender::User);
        assert_eq!(second.sender, Sender::Bot);
    }

    #[tokio::test]
    async fn dictation_replaces_the_input_buffer() {
        let server = server_answering(serde_json::json!({"output": "unused"})).await;
        let speech = Arc::new(CannedSpeech {
            transcript: Some("dictated claim".to_owned()),
        });
        let mut view = view_for(&server).with_speech_input(speech);

        view.set_input("typed but not sent");
        view.dictate().await.unwrap();
        assert_eq!(view.input(), "dictated claim");
    }

    #[tokio::test]
    async fn failed_dictation_leaves_the_buffer_untouched() {
        let server = server_answering(serde_json::json!({"output": "unused"})).await;
        let speech = Arc::new(CannedSpeech { transcript: None });
        let mut view = view_for(&server).with_speech_input(speech);

        view.set_input("half-typed claim");
        assert!(view.dictate().await.is_err());
        assert_eq!(view.input(), "half-typed claim");
    }

    #[tokio::test]
    async fn transcript_length_never_decreases() {
        let server = server_answering(serde_json::json!({"output": "ok"})).await;
        let mut view = view_for(&server);

        let mut previous = 0;
        for i in 0..5 {
            view.set_input(format!("claim {i}"));
            let handle = view.submit().unwrap();
            assert!(view.turns().len() >= previous);
            previous = view.turns().len();
            handle.await.unwrap();
            assert!(view.turns().len() >= previous);
            previous = view.turns().len();
        }
        assert_eq!(view.turns().len(), 10);
    }
}
