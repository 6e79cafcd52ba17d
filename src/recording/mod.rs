//! Microphone capture pathways
//!
//! - `Recorder`: flushes a WAV chunk every interval while recording
//! - `ClipRecorder`: buffers a whole take and hands it over once on stop

mod recorder;
mod widget;

pub use recorder::Recorder;
pub use widget::{ClipRecorder, ClipStatus};
