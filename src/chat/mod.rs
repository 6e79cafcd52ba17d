//! Chat state: the message list and everything an inbound frame can trigger
//!
//! - `message`: senders, entries, the append-only log
//! - `blob`: local references to received audio, released after playback
//! - `dispatch`: turns inbound frames into entries, downloads, alerts, playback
//! - `render`: terminal presentation of the log

mod alert;
mod blob;
mod dispatch;
mod download;
mod message;
mod playback;
pub mod render;

pub use alert::{Alerter, TerminalAlerter};
pub use blob::{AudioRef, BlobStore};
pub use dispatch::{ChatState, Dispatched};
pub use download::{save_chat_history, CHAT_HISTORY_FILE};
pub use message::{Message, MessageLog, Sender};
pub use playback::{AudioPlayer, CommandPlayer};
