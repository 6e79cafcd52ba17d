//! Wire format spoken with the chat backend
//!
//! Outbound: JSON `{ "text": ... }` frames and raw binary audio.
//! Inbound: JSON objects keyed by `text`, `chat_history`, `error` (plus the
//! acknowledgements `info`, `text_done`, `audio_done`) or binary audio.

pub mod messages;

pub use messages::{
    Ack, FrameError, InboundFrame, OutboundFrame, Signal, TextPayload, DOCUMENT_SIGNAL,
    DOWNLOAD_HISTORY_SIGNAL, IMAGE_SIGNAL,
};
