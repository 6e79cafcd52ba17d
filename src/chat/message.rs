use super::blob::AudioRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    You,
    #[serde(rename = "AI")]
    Ai,
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sender::You => "You",
            Sender::Ai => "AI",
            Sender::System => "System",
        };
        f.write_str(s)
    }
}

/// One entry in the conversation view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: Option<String>,
    pub audio: Option<AudioRef>,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: Some(text.into()),
            audio: None,
            at: Utc::now(),
        }
    }

    pub fn audio(sender: Sender, audio: AudioRef) -> Self {
        Self {
            sender,
            text: None,
            audio: Some(audio),
            at: Utc::now(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sender == Sender::You
    }
}

/// Append-only, in-memory conversation
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
