//! Append-only conversation log.
//!
//! A [`Transcript`] holds the ordered chat turns for one session. Turns are
//! immutable once appended; there is no edit, removal, or reordering, and
//! nothing is persisted across sessions.

use serde::{Deserialize, Serialize};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing or dictating.
    User,
    /// The verification assistant.
    Bot,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The message text.
    pub text: String,
    /// Which side produced the turn.
    pub sender: Sender,
    /// Display-formatted local wall-clock time, e.g. `"14:03:27"`.
    pub timestamp: String,
}

impl Turn {
    /// Create a user turn stamped with the current local time.
    pub fn user(text: impl Into<String>) -> Self {
        Self::stamped(text, Sender::User)
    }

    /// Create a bot turn stamped with the current local time.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::stamped(text, Sender::Bot)
    }

    /// Create a turn with an explicit timestamp (deterministic construction
    /// for callers that already formatted one).
    pub fn with_timestamp(
        text: impl Into<String>,
        sender: Sender,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: timestamp.into(),
        }
    }

    fn stamped(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Append-only ordered sequence of chat turns.
///
/// Insertion order is display order. Duplicate turns are allowed; a fast
/// double-submit appends the same user text twice.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end of the conversation.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::user("is this headline real?"));
        transcript.append(Turn::bot("Verified"));
        transcript.append(Turn::user("and this one?"));

        let senders: Vec<Sender> = transcript.turns().iter().map(|t| t.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot, Sender::User]);
        assert_eq!(transcript.turns()[1].text, "Verified");
    }

    #[test]
    fn length_is_monotonically_non_decreasing() {
        let mut transcript = Transcript::new();
        let mut previous = transcript.len();
        for i in 0..10 {
            transcript.append(Turn::user(format!("claim {i}")));
            assert!(transcript.len() > previous);
            previous = transcript.len();
        }
        assert_eq!(transcript.len(), 10);
    }

    #[test]
    fn duplicate_turns_are_kept() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::with_timestamp("same claim", Sender::User, "10:00:00"));
        transcript.append(Turn::with_timestamp("same claim", Sender::User, "10:00:00"));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0], transcript.turns()[1]);
    }

    #[test]
    fn last_returns_most_recent() {
        let mut transcript = Transcript::new();
        assert!(transcript.last().is_none());
        transcript.append(Turn::user("first"));
        transcript.append(Turn::bot("second"));
        assert_eq!(transcript.last().unwrap().text, "second");
    }

    #[test]
    fn stamped_turns_carry_wall_clock_format() {
        let turn = Turn::user("hello");
        // HH:MM:SS
        assert_eq!(turn.timestamp.len(), 8);
        assert_eq!(turn.timestamp.matches(':').count(), 2);
    }
}
