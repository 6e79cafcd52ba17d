use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        Self::from_reader(reader, path.display().to_string())
    }

    /// Decode an in-memory WAV clip, e.g. a synthesized reply
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Not a WAV clip")?;
        Self::from_reader(reader, "<memory>".to_string())
    }

    fn from_reader<R: std::io::Read>(reader: WavReader<R>, path: String) -> Result<Self> {
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            bail!(
                "Unsupported WAV format: {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        debug!(
            "Audio loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path,
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Replays a WAV file as a capture stream, one buffer per `buffer_duration_ms`
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    /// Deliver frames as fast as the consumer takes them instead of in real time
    unpaced: bool,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig) -> Self {
        Self {
            path,
            config,
            unpaced: false,
            task: None,
        }
    }

    pub fn unpaced(mut self) -> Self {
        self.unpaced = true;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let audio = AudioFile::open(&self.path)?;
        if audio.channels == 0 || audio.sample_rate == 0 {
            bail!("WAV file has no audio channels: {}", self.path.display());
        }

        let (tx, rx) = mpsc::channel(100);
        let target_rate = self.config.target_sample_rate;
        let target_channels = self.config.target_channels;
        let buffer_ms = self.config.buffer_duration_ms.max(1);
        let unpaced = self.unpaced;

        let samples_per_buffer =
            (audio.sample_rate as u64 * audio.channels as u64 * buffer_ms / 1000).max(1) as usize;

        info!(
            "Replaying {} ({:.1}s) in {}ms buffers",
            audio.path, audio.duration_seconds, buffer_ms
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(buffer_ms));
            let mut timestamp_ms = 0u64;

            for chunk in audio.samples.chunks(samples_per_buffer) {
                if !unpaced {
                    interval.tick().await;
                }

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms,
                };
                timestamp_ms += frame.duration_ms();

                let frame = convert::process_frame(frame, target_rate, target_channels);
                if tx.send(frame).await.is_err() {
                    break;
                }
            }

            debug!("File replay finished");
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
