use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Sentinel announcing that a document was shared
pub const DOCUMENT_SIGNAL: &str = "DOCUMENT_SENT:Sample Document";

/// Sentinel announcing that an image was shared
pub const IMAGE_SIGNAL: &str = "IMAGE_SENT:Sample Image";

/// Sentinel asking the backend to send back the stored conversation
pub const DOWNLOAD_HISTORY_SIGNAL: &str = "DOWNLOAD_CHAT_HISTORY_BUTTON_CLICKED";

/// JSON body of every outbound text frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// Plain-text signals the backend recognises by prefix or exact match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Document,
    Image,
    DownloadHistory,
}

impl Signal {
    pub fn sentinel(self) -> &'static str {
        match self {
            Signal::Document => DOCUMENT_SIGNAL,
            Signal::Image => IMAGE_SIGNAL,
            Signal::DownloadHistory => DOWNLOAD_HISTORY_SIGNAL,
        }
    }

    /// Line recorded in the local message list after the signal goes out
    pub fn system_note(self) -> &'static str {
        match self {
            Signal::Document => "Sent a document.",
            Signal::Image => "Sent an image.",
            Signal::DownloadHistory => "Requested chat history download.",
        }
    }
}

/// A frame queued for the socket writer
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Serialized as `{ "text": ... }`
    Text(String),
    /// Raw binary audio (one recorder chunk or one recorded clip)
    Audio(Vec<u8>),
    /// Orderly close handshake
    Close,
}

impl OutboundFrame {
    pub fn chat(text: impl Into<String>) -> Self {
        OutboundFrame::Text(text.into())
    }

    pub fn signal(signal: Signal) -> Self {
        OutboundFrame::Text(signal.sentinel().to_string())
    }

    pub fn into_message(self) -> Result<Message, FrameError> {
        Ok(match self {
            OutboundFrame::Text(text) => {
                let json = serde_json::to_string(&TextPayload { text })
                    .map_err(FrameError::Malformed)?;
                Message::Text(json.into())
            }
            OutboundFrame::Audio(bytes) => Message::Binary(bytes.into()),
            OutboundFrame::Close => Message::Close(None),
        })
    }
}

/// Acknowledgements the backend emits alongside replies
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    Info(String),
    TextDone,
    AudioDone,
}

/// Every frame shape the client understands
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    TextReply(String),
    /// Stored conversation, kept verbatim for the download file
    HistoryPayload(Value),
    ErrorPayload(String),
    Ack(Ack),
    /// Synthesized speech, playable as delivered
    AudioChunk(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed JSON frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("JSON frame is not an object")]
    NotAnObject,

    #[error("unrecognized frame with keys [{0}]")]
    Unrecognized(String),
}

impl InboundFrame {
    /// Classify a text frame. Keys are checked in priority order
    /// `text`, `chat_history`, `error`, then the acknowledgements; a key only
    /// counts when its value is truthy, so `{"text": ""}` falls through.
    pub fn parse_text(raw: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(raw).map_err(FrameError::Malformed)?;
        let object = value.as_object().ok_or(FrameError::NotAnObject)?;

        let field = |key: &str| object.get(key).filter(|v| is_truthy(v));

        if let Some(text) = field("text") {
            return Ok(InboundFrame::TextReply(display_value(text)));
        }
        if let Some(history) = field("chat_history") {
            return Ok(InboundFrame::HistoryPayload(history.clone()));
        }
        if let Some(error) = field("error") {
            return Ok(InboundFrame::ErrorPayload(display_value(error)));
        }
        if let Some(info) = field("info") {
            return Ok(InboundFrame::Ack(Ack::Info(display_value(info))));
        }
        if field("text_done").is_some() {
            return Ok(InboundFrame::Ack(Ack::TextDone));
        }
        if field("audio_done").is_some() {
            return Ok(InboundFrame::Ack(Ack::AudioDone));
        }

        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        Err(FrameError::Unrecognized(keys.join(", ")))
    }

    /// Decode a transport message. Control frames (ping, pong, close) yield `None`.
    pub fn from_message(message: Message) -> Result<Option<Self>, FrameError> {
        match message {
            Message::Text(text) => Self::parse_text(text.as_str()).map(Some),
            Message::Binary(bytes) => Ok(Some(InboundFrame::AudioChunk(bytes.to_vec()))),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => Ok(None),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_wins_over_other_keys() {
        let frame = InboundFrame::parse_text(r#"{"text":"hi","error":"boom"}"#).unwrap();
        assert_eq!(frame, InboundFrame::TextReply("hi".into()));
    }

    #[test]
    fn empty_text_falls_through_to_error() {
        let frame = InboundFrame::parse_text(r#"{"text":"","error":"boom"}"#).unwrap();
        assert_eq!(frame, InboundFrame::ErrorPayload("boom".into()));
    }

    #[test]
    fn empty_history_array_is_still_a_payload() {
        let frame = InboundFrame::parse_text(r#"{"chat_history":[]}"#).unwrap();
        assert_eq!(frame, InboundFrame::HistoryPayload(json!([])));
    }

    #[test]
    fn null_history_is_unrecognized() {
        let err = InboundFrame::parse_text(r#"{"chat_history":null}"#).unwrap_err();
        assert!(matches!(err, FrameError::Unrecognized(keys) if keys == "chat_history"));
    }

    #[test]
    fn acknowledgements() {
        assert_eq!(
            InboundFrame::parse_text(r#"{"info":"Document received"}"#).unwrap(),
            InboundFrame::Ack(Ack::Info("Document received".into()))
        );
        assert_eq!(
            InboundFrame::parse_text(r#"{"text_done":true}"#).unwrap(),
            InboundFrame::Ack(Ack::TextDone)
        );
        assert_eq!(
            InboundFrame::parse_text(r#"{"audio_done":true}"#).unwrap(),
            InboundFrame::Ack(Ack::AudioDone)
        );
    }

    #[test]
    fn malformed_and_non_object_frames_are_errors() {
        assert!(matches!(
            InboundFrame::parse_text("not json"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            InboundFrame::parse_text("[1,2]"),
            Err(FrameError::NotAnObject)
        ));
        assert!(matches!(
            InboundFrame::parse_text("null"),
            Err(FrameError::NotAnObject)
        ));
    }

    #[test]
    fn outbound_text_is_wrapped_in_json() {
        let msg = OutboundFrame::signal(Signal::DownloadHistory)
            .into_message()
            .unwrap();
        match msg {
            Message::Text(text) => {
                let payload: TextPayload = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(payload.text, DOWNLOAD_HISTORY_SIGNAL);
            }
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn binary_message_becomes_audio_chunk() {
        let frame = InboundFrame::from_message(Message::Binary(vec![1u8, 2, 3].into()))
            .unwrap()
            .unwrap();
        assert_eq!(frame, InboundFrame::AudioChunk(vec![1, 2, 3]));
        assert!(InboundFrame::from_message(Message::Ping(Vec::<u8>::new().into()))
            .unwrap()
            .is_none());
    }
}
