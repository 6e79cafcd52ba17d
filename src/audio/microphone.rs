// Default input device capture through cpal
//
// cpal streams are not Send, so each capture owns a dedicated thread that
// builds the stream, keeps it alive until told to stop, and drops it to
// release the device.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert;

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.thread.is_some() {
            bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("microphone-capture".to_string())
            .spawn(move || match build_stream(&config, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop() or the backend is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                    info!("Microphone released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .context("Failed to spawn capture thread")?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                bail!("Capture thread exited before the device opened");
            }
        }

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Capture thread join failed")?
                .map_err(|_| anyhow!("Capture thread panicked"))?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn build_stream(config: &AudioBackendConfig, frame_tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;

    let supported = device
        .default_input_config()
        .context("Failed to query input device configuration")?;

    info!(
        "Opening {} ({}Hz, {} channels, {:?})",
        device.name().unwrap_or_else(|_| "input device".to_string()),
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => input_stream::<f32>(&device, &stream_config, config, frame_tx)?,
        cpal::SampleFormat::I16 => input_stream::<i16>(&device, &stream_config, config, frame_tx)?,
        cpal::SampleFormat::U16 => input_stream::<u16>(&device, &stream_config, config, frame_tx)?,
        other => bail!("Unsupported input sample format: {:?}", other),
    };

    stream.play().context("Failed to start input stream")?;
    Ok(stream)
}

fn input_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let target_rate = config.target_sample_rate;
    let target_channels = config.target_channels;
    let mut captured_samples: u64 = 0;

    let stream = device.build_input_stream(
        stream_config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let timestamp_ms =
                captured_samples * 1000 / (sample_rate as u64 * channels.max(1) as u64);
            captured_samples += data.len() as u64;

            let frame = AudioFrame {
                samples: data.iter().map(|&s| s.to_sample::<i16>()).collect(),
                sample_rate,
                channels,
                timestamp_ms,
            };

            let frame = convert::process_frame(frame, target_rate, target_channels);
            if frame_tx.try_send(frame).is_err() {
                warn!("Dropping captured audio: frame queue full or closed");
            }
        },
        |e| error!("Input stream error: {}", e),
        None,
    )?;

    Ok(stream)
}
