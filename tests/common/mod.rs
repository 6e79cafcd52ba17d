// Shared fixtures: in-memory sockets, recording alert/playback doubles, WAV files

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use futures::stream::{SplitSink, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use voice_chat::{
    Alerter, App, AudioPlayer, Connection, Connector, SessionEvent, SessionKey,
};

pub type ServerSink = SplitSink<WebSocketStream<DuplexStream>, Message>;

/// Backend side of one in-memory connection
pub struct ServerEnd {
    pub url: String,
    pub sink: ServerSink,
    /// Everything the client sent, in order
    pub received: mpsc::UnboundedReceiver<Message>,
}

impl ServerEnd {
    pub async fn next_message(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Connector that pairs each client socket with an in-memory server socket
pub struct DuplexConnector {
    servers: mpsc::UnboundedSender<ServerEnd>,
    connects: AtomicUsize,
}

impl DuplexConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                servers,
                connects: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for DuplexConnector {
    async fn connect(
        &self,
        key: &SessionKey,
        url: &str,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Connection> {
        let (client, server) = tokio::io::duplex(1 << 20);
        let (client_ws, server_ws) = tokio::join!(
            WebSocketStream::from_raw_socket(client, Role::Client, None),
            WebSocketStream::from_raw_socket(server, Role::Server, None),
        );

        let (sink, mut stream) = server_ws.split();
        let (tx, received) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        });

        self.servers
            .send(ServerEnd {
                url: url.to_string(),
                sink,
                received,
            })
            .map_err(|_| anyhow!("test dropped the server receiver"))?;
        self.connects.fetch_add(1, Ordering::SeqCst);

        Ok(Connection::spawn(key.clone(), url.to_string(), client_ws, events))
    }
}

/// Connector whose every attempt fails, like an unreachable backend
pub struct RefusingConnector;

#[async_trait::async_trait]
impl Connector for RefusingConnector {
    async fn connect(
        &self,
        _key: &SessionKey,
        url: &str,
        _events: mpsc::Sender<SessionEvent>,
    ) -> Result<Connection> {
        Err(anyhow!("connection refused: {}", url))
    }
}

#[derive(Default)]
pub struct RecordingAlerter {
    pub alerts: Mutex<Vec<String>>,
}

impl RecordingAlerter {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Alerter for RecordingAlerter {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

/// Finishes playback immediately; remembers whether each clip existed when played
#[derive(Default)]
pub struct InstantPlayer {
    pub played: Mutex<Vec<(PathBuf, bool)>>,
}

#[async_trait::async_trait]
impl AudioPlayer for InstantPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        self.played
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        Ok(())
    }
}

/// Autoplay blocked
pub struct BlockedPlayer;

#[async_trait::async_trait]
impl AudioPlayer for BlockedPlayer {
    async fn play(&self, _path: &Path) -> Result<()> {
        Err(anyhow!("autoplay blocked"))
    }
}

/// Write a 16-bit PCM WAV with a ramp of `samples` samples
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: usize) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..samples {
        writer.write_sample((i % 1000) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Handle app events until `done` holds, failing after five seconds
pub async fn pump_until(app: &mut App, mut done: impl FnMut(&App) -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done(&*app) {
        let event = tokio::time::timeout_at(deadline, app.next_event())
            .await
            .map_err(|_| anyhow!("timed out waiting for app state"))?
            .ok_or_else(|| anyhow!("app event channels closed"))?;
        app.handle_event(event).await;
    }
    Ok(())
}
