//! End-to-end submit flow tests against a mock endpoint.
//!
//! Exercises the full view orchestration: guard, user turn, remote call,
//! bot turn, speech dispatch, including overlapping submissions resolving
//! out of order.

use async_trait::async_trait;
use newshound::config::VerdictConfig;
use newshound::error::Result;
use newshound::speech::{SpeechInput, SpeechOutput};
use newshound::transcript::Sender;
use newshound::{ChatView, VerdictClient};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn view_for(server: &MockServer) -> ChatView {
    let config = VerdictConfig {
        endpoint_url: format!("{}/run-flow", server.uri()),
    };
    ChatView::new(VerdictClient::new(&config))
}

struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    speaking: AtomicBool,
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

struct CannedSpeech {
    transcript: String,
}

#[async_trait]
impl SpeechInput for CannedSpeech {
    async fn capture_utterance(&self) -> Result<String> {
        Ok(self.transcript.clone())
    }
}

#[tokio::test]
async fn overlapping_submissions_append_in_resolution_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run-flow"))
        .and(body_partial_json(json!({"inputValue": "slow claim"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"output": "slow verdict"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/run-flow"))
        .and(body_partial_json(json!({"inputValue": "fast claim"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "fast verdict"})))
        .mount(&server)
        .await;

    let mut view = view_for(&server);

    view.set_input("slow claim");
    let slow = view.submit().unwrap();
    view.set_input("fast claim");
    let fast = view.submit().unwrap();

    fast.await.unwrap();
    slow.await.unwrap();

    // No ordering contract across overlapping submissions: the fast reply
    // lands first even though it was submitted second.
    let bot_turns: Vec<String> = view
        .turns()
        .into_iter()
        .filter(|t| t.sender == Sender::Bot)
        .map(|t| t.text)
        .collect();
    assert_eq!(bot_turns, vec!["fast verdict", "slow verdict"]);
}

#[tokio::test]
async fn voice_round_trip_dictates_submits_and_speaks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-flow"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"output": "That story checks out."})),
        )
        .mount(&server)
        .await;

    let speech_out = Arc::new(RecordingSpeech {
        spoken: Mutex::new(Vec::new()),
        speaking: AtomicBool::new(false),
    });
    let speech_in = Arc::new(CannedSpeech {
        transcript: "did the mayor really resign".to_owned(),
    });

    let mut view = view_for(&server)
        .with_speech_input(speech_in)
        .with_speech_output(Arc::clone(&speech_out) as Arc<dyn SpeechOutput>);

    view.dictate().await.unwrap();
    assert_eq!(view.input(), "did the mayor really resign");

    view.submit().unwrap().await.unwrap();

    let turns = view.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "did the mayor really resign");
    assert_eq!(turns[1].text, "That story checks out.");
    assert_eq!(
        speech_out.spoken.lock().unwrap().as_slice(),
        ["That story checks out.".to_owned()]
    );
}

#[tokio::test]
async fn keyboard_only_view_never_touches_speech() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-flow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "Verified"})))
        .mount(&server)
        .await;

    let mut view = view_for(&server);
    assert!(!view.is_speaking());
    view.stop_speaking(); // no-op without a speech output

    view.set_input("plain text claim");
    view.submit().unwrap().await.unwrap();
    assert_eq!(view.turns().len(), 2);

    // Dictation without a speech input leaves the buffer alone.
    view.set_input("unsent");
    view.dictate().await.unwrap();
    assert_eq!(view.input(), "unsent");
}
