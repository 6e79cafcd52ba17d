use super::alert::Alerter;
use super::blob::{AudioRef, BlobStore};
use super::download::save_chat_history;
use super::message::{Message, MessageLog, Sender};
use super::playback::AudioPlayer;
use crate::audio::AudioFile;
use crate::protocol::{Ack, InboundFrame};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What handling an inbound frame did
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// A message entry was appended
    Appended,
    /// The history file was written
    Downloaded(PathBuf),
    /// The backend error was shown to the user
    Alerted,
    /// An acknowledgement, logged only
    Acknowledged,
}

/// The conversation view and the side effects of inbound frames
pub struct ChatState {
    log: MessageLog,
    blobs: BlobStore,
    download_dir: PathBuf,
    alerter: Arc<dyn Alerter>,
    player: Arc<dyn AudioPlayer>,
    /// Receives each clip once its playback attempt is over
    playback_tx: mpsc::Sender<AudioRef>,
}

impl ChatState {
    pub fn new(
        download_dir: PathBuf,
        blobs: BlobStore,
        alerter: Arc<dyn Alerter>,
        player: Arc<dyn AudioPlayer>,
        playback_tx: mpsc::Sender<AudioRef>,
    ) -> Self {
        Self {
            log: MessageLog::new(),
            blobs,
            download_dir,
            alerter,
            player,
            playback_tx,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.log.entries()
    }

    pub fn push(&mut self, message: Message) {
        self.log.push(message);
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn handle_frame(&mut self, frame: InboundFrame) -> Result<Dispatched> {
        match frame {
            InboundFrame::TextReply(text) => {
                self.log.push(Message::text(Sender::Ai, text));
                Ok(Dispatched::Appended)
            }

            InboundFrame::HistoryPayload(history) => {
                info!("Received chat history");
                let path = save_chat_history(&self.download_dir, &history)?;
                Ok(Dispatched::Downloaded(path))
            }

            InboundFrame::ErrorPayload(message) => {
                warn!("Backend reported an error: {}", message);
                self.alerter.alert(&message);
                Ok(Dispatched::Alerted)
            }

            InboundFrame::Ack(ack) => {
                match ack {
                    Ack::Info(info) => info!("Backend: {}", info),
                    Ack::TextDone => debug!("Text reply complete"),
                    Ack::AudioDone => debug!("Audio reply complete"),
                }
                Ok(Dispatched::Acknowledged)
            }

            InboundFrame::AudioChunk(bytes) => {
                match AudioFile::from_bytes(&bytes) {
                    Ok(clip) => info!(
                        "Received audio reply: {:.1}s at {}Hz",
                        clip.duration_seconds, clip.sample_rate
                    ),
                    Err(_) => debug!("Received {} bytes of non-WAV audio", bytes.len()),
                }

                let audio = self.blobs.create(&bytes)?;
                self.log.push(Message::audio(Sender::Ai, audio.clone()));
                self.autoplay(audio);
                Ok(Dispatched::Appended)
            }
        }
    }

    /// Release a clip whose playback has ended
    pub fn playback_finished(&mut self, audio: &AudioRef) {
        if !self.blobs.revoke(audio) {
            debug!("{} already released", audio);
        }
    }

    fn autoplay(&self, audio: AudioRef) {
        let Some(path) = self.blobs.path(&audio).map(Path::to_path_buf) else {
            return;
        };
        let player = Arc::clone(&self.player);
        let done = self.playback_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = player.play(&path).await {
                error!("Failed to play audio: {:#}", e);
            }
            let _ = done.send(audio).await;
        });
    }
}
