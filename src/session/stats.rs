use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the current session's connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub organization: String,

    pub request_id: String,

    /// Whether the socket is still open
    pub connected: bool,

    /// When the socket was opened
    pub opened_at: DateTime<Utc>,

    /// Frames handed to the socket writer
    pub frames_sent: usize,

    /// Bytes of binary audio handed to the socket writer
    pub audio_bytes_sent: usize,

    /// Frames received (text and binary, control frames excluded)
    pub frames_received: usize,
}
