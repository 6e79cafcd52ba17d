pub mod app;
pub mod audio;
pub mod chat;
pub mod config;
pub mod protocol;
pub mod recording;
pub mod session;

pub use app::{App, AppDeps, AppEvent, Command};
pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioChunk, AudioFile, AudioFrame,
    AudioSource, ChunkConfig, ChunkMetadata, ChunkedRecorder, FileBackend,
};
pub use chat::{
    Alerter, AudioPlayer, AudioRef, BlobStore, ChatState, CommandPlayer, Dispatched, Message,
    Sender, TerminalAlerter,
};
pub use config::Config;
pub use protocol::{InboundFrame, OutboundFrame, Signal};
pub use recording::{ClipRecorder, ClipStatus, Recorder};
pub use session::{
    Connection, ConnectionEvent, Connector, SendError, SessionController, SessionEvent, SessionKey,
    SessionStats, WebSocketConnector,
};
