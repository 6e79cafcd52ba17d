use anyhow::{Context, Result};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::AudioFrame;

/// Chunk configuration
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Length of audio packed into each chunk (default: 7 seconds)
    pub chunk_duration: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_duration: Duration::from_secs(7),
        }
    }
}

/// Metadata for a single chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMetadata {
    /// Chunk number (0-indexed)
    pub chunk_index: usize,
    /// Start time in milliseconds since capture started
    pub start_ms: u64,
    /// Timestamp of the last frame in the chunk
    pub end_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of samples in this chunk
    pub sample_count: usize,
}

/// One flushed chunk, WAV-encoded and ready to go out as a binary frame
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub metadata: ChunkMetadata,
    pub wav: Vec<u8>,
}

/// Chunked audio recorder
///
/// Receives audio frames from a backend and flushes them in fixed-duration
/// WAV chunks. Empty chunks are never emitted.
pub struct ChunkedRecorder {
    config: ChunkConfig,
    current_chunk: Option<ChunkWriter>,
    chunk_index: usize,
}

impl ChunkedRecorder {
    pub fn new(config: ChunkConfig) -> Self {
        debug!(
            "Chunked recorder initialized ({:?} per chunk)",
            config.chunk_duration
        );

        Self {
            config,
            current_chunk: None,
            chunk_index: 0,
        }
    }

    /// Consume frames until the channel closes, emitting each completed chunk
    /// on `chunk_tx`. The final partial chunk is flushed when input ends.
    pub async fn record(
        &mut self,
        mut audio_rx: mpsc::Receiver<AudioFrame>,
        chunk_tx: mpsc::Sender<AudioChunk>,
    ) -> Result<Vec<ChunkMetadata>> {
        let mut metadata = Vec::new();

        while let Some(frame) = audio_rx.recv().await {
            if self.should_start_new_chunk(&frame) {
                if let Some(chunk) = self.current_chunk.take() {
                    self.flush(chunk, &chunk_tx, &mut metadata).await?;
                }

                self.current_chunk = Some(self.start_new_chunk(&frame));
            }

            if let Some(chunk) = &mut self.current_chunk {
                chunk.write_frame(&frame);
            }
        }

        if let Some(chunk) = self.current_chunk.take() {
            self.flush(chunk, &chunk_tx, &mut metadata).await?;
        }

        info!("Chunked recording complete: {} chunks sent", metadata.len());

        Ok(metadata)
    }

    async fn flush(
        &self,
        chunk: ChunkWriter,
        chunk_tx: &mpsc::Sender<AudioChunk>,
        metadata: &mut Vec<ChunkMetadata>,
    ) -> Result<()> {
        let Some(chunk) = chunk.finish()? else {
            return Ok(());
        };

        info!(
            "Chunk {} complete: {:.1}s - {:.1}s ({} samples, {} bytes)",
            chunk.metadata.chunk_index,
            chunk.metadata.start_ms as f64 / 1000.0,
            chunk.metadata.end_ms as f64 / 1000.0,
            chunk.metadata.sample_count,
            chunk.wav.len()
        );

        metadata.push(chunk.metadata.clone());
        chunk_tx
            .send(chunk)
            .await
            .context("Chunk receiver dropped")?;

        Ok(())
    }

    fn should_start_new_chunk(&self, frame: &AudioFrame) -> bool {
        match &self.current_chunk {
            None => true,
            Some(chunk) => {
                let chunk_duration_ms = self.config.chunk_duration.as_millis() as u64;
                let elapsed_ms = frame.timestamp_ms.saturating_sub(chunk.metadata.start_ms);
                elapsed_ms >= chunk_duration_ms
            }
        }
    }

    fn start_new_chunk(&mut self, frame: &AudioFrame) -> ChunkWriter {
        let chunk = ChunkWriter::new(
            self.chunk_index,
            frame.timestamp_ms,
            frame.sample_rate,
            frame.channels,
        );

        self.chunk_index += 1;

        chunk
    }
}

/// Accumulates one chunk's samples until it is encoded
struct ChunkWriter {
    samples: Vec<i16>,
    metadata: ChunkMetadata,
}

impl ChunkWriter {
    fn new(chunk_index: usize, start_ms: u64, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            metadata: ChunkMetadata {
                chunk_index,
                start_ms,
                end_ms: start_ms,
                sample_rate,
                channels,
                sample_count: 0,
            },
        }
    }

    fn write_frame(&mut self, frame: &AudioFrame) {
        self.samples.extend_from_slice(&frame.samples);
        self.metadata.end_ms = frame.timestamp_ms;
        self.metadata.sample_count += frame.samples.len();
    }

    fn finish(self) -> Result<Option<AudioChunk>> {
        if self.samples.is_empty() {
            return Ok(None);
        }

        let wav = encode_wav(
            &self.samples,
            self.metadata.sample_rate,
            self.metadata.channels,
        )?;

        Ok(Some(AudioChunk {
            metadata: self.metadata,
            wav,
        }))
    }
}

/// Encode interleaved PCM16 samples as a complete WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV encoder")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
