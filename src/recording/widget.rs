use crate::audio::{encode_wav, AudioBackend, AudioFrame};
use anyhow::{Context, Result};
use std::fmt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Recorder widget status, as shown next to its buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    Idle,
    AcquiringMedia,
    Recording,
    Stopped,
    PermissionDenied,
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClipStatus::Idle => "idle",
            ClipStatus::AcquiringMedia => "acquiring_media",
            ClipStatus::Recording => "recording",
            ClipStatus::Stopped => "stopped",
            ClipStatus::PermissionDenied => "permission_denied",
        };
        f.write_str(s)
    }
}

struct Take {
    backend: Box<dyn AudioBackend>,
    task: JoinHandle<Vec<AudioFrame>>,
}

/// Records one take and returns it as a single WAV clip when stopped
pub struct ClipRecorder {
    status: ClipStatus,
    take: Option<Take>,
}

impl Default for ClipRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipRecorder {
    pub fn new() -> Self {
        Self {
            status: ClipStatus::Idle,
            take: None,
        }
    }

    pub fn status(&self) -> ClipStatus {
        self.status
    }

    pub async fn start(&mut self, mut backend: Box<dyn AudioBackend>) -> Result<()> {
        if self.take.is_some() {
            warn!("Clip recording already in progress");
            return Ok(());
        }

        self.status = ClipStatus::AcquiringMedia;
        let mut audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.status = ClipStatus::PermissionDenied;
                return Err(e.context(format!("Error accessing {}", backend.name())));
            }
        };

        let task = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = audio_rx.recv().await {
                frames.push(frame);
            }
            frames
        });

        info!("Clip recording started from {}", backend.name());
        self.status = ClipStatus::Recording;
        self.take = Some(Take { backend, task });
        Ok(())
    }

    /// Stop and return the take as WAV bytes; `None` if nothing was recorded
    pub async fn stop(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(mut take) = self.take.take() else {
            return Ok(None);
        };

        if let Err(e) = take.backend.stop().await {
            error!("Failed to stop {}: {}", take.backend.name(), e);
        }
        drop(take.backend);

        let frames = take.task.await.context("Clip task panicked")?;
        self.status = ClipStatus::Stopped;

        let Some(first) = frames.first() else {
            return Ok(None);
        };
        let (sample_rate, channels) = (first.sample_rate, first.channels);

        let samples: Vec<i16> = frames
            .iter()
            .flat_map(|f| f.samples.iter().copied())
            .collect();
        if samples.is_empty() {
            return Ok(None);
        }

        info!(
            "Clip recorded: {} samples at {}Hz",
            samples.len(),
            sample_rate
        );

        encode_wav(&samples, sample_rate, channels).map(Some)
    }
}
