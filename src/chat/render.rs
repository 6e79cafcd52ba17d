//! Terminal rendering of the conversation
//!
//! Sent entries are indented to the right and green; received entries sit on
//! the left, cyan for the assistant and yellow for local system notes.

use super::message::{Message, Sender};
use colored::Colorize;

const SENT_INDENT: &str = "        ";

/// One entry without colour: `<sender>: <text>` and/or `[audio blob:...]`
pub fn render_plain(message: &Message) -> String {
    let indent = if message.is_sent() { SENT_INDENT } else { "" };
    let mut lines = Vec::new();

    if let Some(text) = &message.text {
        lines.push(format!("{}{}: {}", indent, message.sender, text));
    }
    if let Some(audio) = &message.audio {
        lines.push(format!("{}{}: [audio {}]", indent, message.sender, audio));
    }

    lines.join("\n")
}

pub fn render_message(message: &Message) -> String {
    let plain = render_plain(message);
    match message.sender {
        Sender::You => plain.green().to_string(),
        Sender::Ai => plain.cyan().to_string(),
        Sender::System => plain.yellow().dimmed().to_string(),
    }
}

pub fn render(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::BlobStore;

    #[test]
    fn sent_entries_are_indented() {
        let line = render_plain(&Message::text(Sender::You, "hello"));
        assert_eq!(line, format!("{}You: hello", SENT_INDENT));

        let line = render_plain(&Message::text(Sender::Ai, "hi there"));
        assert_eq!(line, "AI: hi there");
    }

    #[test]
    fn audio_entries_show_reference() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = BlobStore::new(dir.path());
        let audio = store.create(b"RIFF").unwrap();

        let line = render_plain(&Message::audio(Sender::Ai, audio.clone()));
        assert_eq!(line, format!("AI: [audio {}]", audio));
    }

    #[test]
    fn renders_in_order() {
        let messages = vec![
            Message::text(Sender::System, "Sent a document."),
            Message::text(Sender::Ai, "Thanks"),
        ];
        let out = render(&messages);
        let first = out.find("Sent a document.").unwrap();
        let second = out.find("Thanks").unwrap();
        assert!(first < second);
    }
}
