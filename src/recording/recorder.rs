use crate::audio::{AudioBackend, AudioChunk, ChunkConfig, ChunkMetadata, ChunkedRecorder};
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

struct ActiveRecording {
    backend: Box<dyn AudioBackend>,
    task: JoinHandle<Result<Vec<ChunkMetadata>>>,
}

/// Interval recorder: every `chunk_duration` of captured audio is flushed as
/// one WAV chunk on the chunk channel
pub struct Recorder {
    config: ChunkConfig,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// False once capture has ended, whether by `stop` or because the
    /// source ran out (a replayed file)
    pub fn is_recording(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Acquire the device and start chunking. Does nothing if already recording.
    ///
    /// On failure the backend is dropped and the recorder stays idle.
    pub async fn start(
        &mut self,
        mut backend: Box<dyn AudioBackend>,
        chunk_tx: mpsc::Sender<AudioChunk>,
    ) -> Result<()> {
        if self.is_recording() {
            warn!("Recording already started");
            return Ok(());
        }
        if self.active.is_some() {
            // The previous source ended by itself
            if let Err(e) = self.stop().await {
                warn!("Previous recording ended with an error: {:#}", e);
            }
        }

        let audio_rx = backend
            .start()
            .await
            .with_context(|| format!("Error accessing {}", backend.name()))?;

        let mut chunker = ChunkedRecorder::new(self.config.clone());
        let task = tokio::spawn(async move { chunker.record(audio_rx, chunk_tx).await });

        info!(
            "Recording started from {} ({:?} chunks)",
            backend.name(),
            self.config.chunk_duration
        );

        self.active = Some(ActiveRecording { backend, task });
        Ok(())
    }

    /// Release the device and flush the last partial chunk. Does nothing if idle.
    pub async fn stop(&mut self) -> Result<Vec<ChunkMetadata>> {
        let Some(mut active) = self.active.take() else {
            warn!("Recording not active");
            return Ok(Vec::new());
        };

        if let Err(e) = active.backend.stop().await {
            error!("Failed to stop {}: {}", active.backend.name(), e);
        }
        // The frame channel closes with the backend
        drop(active.backend);

        let metadata = active.task.await.context("Chunking task panicked")??;
        info!("Recording stopped: {} chunks", metadata.len());

        Ok(metadata)
    }
}
