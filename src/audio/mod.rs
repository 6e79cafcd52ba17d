pub mod backend;
pub mod chunk;
pub mod convert;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use chunk::{encode_wav, AudioChunk, ChunkConfig, ChunkMetadata, ChunkedRecorder};
pub use file::{AudioFile, FileBackend};
