use super::key::SessionKey;
use crate::protocol::{InboundFrame, OutboundFrame};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

/// Frames that may wait for the socket writer before `send` reports backpressure
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// How long `close` waits for the close frame to be flushed
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle and data events of one connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    Frame(InboundFrame),
    Closed,
    Error(String),
}

/// A connection event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub key: SessionKey,
    pub event: ConnectionEvent,
}

/// Why an outbound frame was not queued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("no connection is open")]
    NotConnected,

    #[error("connection is closed")]
    Closed,

    #[error("outbound queue is full ({0} frames pending)")]
    QueueFull(usize),
}

#[derive(Debug, Default)]
struct Counters {
    frames_sent: AtomicUsize,
    audio_bytes_sent: AtomicUsize,
    frames_received: AtomicUsize,
}

/// Establishes connections for a session
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`; events are delivered on `events`
    async fn connect(
        &self,
        key: &SessionKey,
        url: &str,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Connection>;
}

/// Connector backed by `tokio-tungstenite`
#[derive(Debug, Clone, Copy)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        key: &SessionKey,
        url: &str,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Connection> {
        info!("Connecting to {}", url);

        let connecting = tokio_tungstenite::connect_async(url);
        let (ws_stream, _response) = match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(result) => result.with_context(|| format!("Failed to connect to {}", url))?,
            Err(_) => bail!("Timed out connecting to {} after {:?}", url, self.connect_timeout),
        };

        Ok(Connection::spawn(key.clone(), url.to_string(), ws_stream, events))
    }
}

/// One open WebSocket, exclusively owned by a session
///
/// A single writer task drains the outbound queue, so frames leave in the
/// order they were sent. A reader task decodes inbound frames and forwards
/// them, tagged with the session key.
pub struct Connection {
    key: SessionKey,
    url: String,
    opened_at: DateTime<Utc>,
    /// Taken on close so the writer sees the end of the queue
    outbound: Option<mpsc::Sender<OutboundFrame>>,
    open: Arc<AtomicBool>,
    counters: Arc<Counters>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    /// Drive an already-established socket
    pub fn spawn<S>(
        key: SessionKey,
        url: String,
        socket: S,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self
    where
        S: Sink<Message, Error = WsError>
            + Stream<Item = Result<Message, WsError>>
            + Send
            + Unpin
            + 'static,
    {
        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_QUEUE_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let writer_key = key.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = frame == OutboundFrame::Close;

                let message = match frame.into_message() {
                    Ok(message) => message,
                    Err(e) => {
                        error!("Failed to encode outbound frame: {}", e);
                        continue;
                    }
                };

                if let Err(e) = sink.send(message).await {
                    error!("WebSocket send failed ({}): {}", writer_key, e);
                    break;
                }

                if closing {
                    break;
                }
            }

            debug!("Writer task stopped ({})", writer_key);
        });

        let reader_key = key.clone();
        let reader_open = Arc::clone(&open);
        let reader_counters = Arc::clone(&counters);
        let reader = tokio::spawn(async move {
            let emit = |event: ConnectionEvent| {
                let events = events.clone();
                let key = reader_key.clone();
                async move {
                    // The app may already be gone during shutdown
                    let _ = events.send(SessionEvent { key, event }).await;
                }
            };

            emit(ConnectionEvent::Opened).await;

            while let Some(item) = stream.next().await {
                match item {
                    Ok(message) => match InboundFrame::from_message(message) {
                        Ok(Some(frame)) => {
                            reader_counters.frames_received.fetch_add(1, Ordering::SeqCst);
                            emit(ConnectionEvent::Frame(frame)).await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Dropping inbound frame ({}): {}", reader_key, e);
                        }
                    },
                    Err(e) => {
                        emit(ConnectionEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }

            reader_open.store(false, Ordering::SeqCst);
            emit(ConnectionEvent::Closed).await;
        });

        Self {
            key,
            url,
            opened_at: Utc::now(),
            outbound: Some(outbound),
            open,
            counters,
            writer: Some(writer),
            reader: Some(reader),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a frame for the writer. Never waits on the network.
    pub fn send(&self, frame: OutboundFrame) -> Result<(), SendError> {
        let Some(outbound) = self.outbound.as_ref().filter(|_| self.is_open()) else {
            return Err(SendError::Closed);
        };

        let audio_bytes = match &frame {
            OutboundFrame::Audio(bytes) => bytes.len(),
            _ => 0,
        };

        outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull(OUTBOUND_QUEUE_CAPACITY),
            TrySendError::Closed(_) => SendError::Closed,
        })?;

        self.counters.frames_sent.fetch_add(1, Ordering::SeqCst);
        self.counters
            .audio_bytes_sent
            .fetch_add(audio_bytes, Ordering::SeqCst);

        Ok(())
    }

    pub fn frames_sent(&self) -> usize {
        self.counters.frames_sent.load(Ordering::SeqCst)
    }

    pub fn audio_bytes_sent(&self) -> usize {
        self.counters.audio_bytes_sent.load(Ordering::SeqCst)
    }

    pub fn frames_received(&self) -> usize {
        self.counters.frames_received.load(Ordering::SeqCst)
    }

    /// Send a close frame, wait for it to flush, then stop both tasks.
    /// If the server already closed, the writer just drains and exits.
    pub async fn close(mut self) {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if let Some(outbound) = self.outbound.take() {
            if was_open {
                if let Err(e) = outbound.try_send(OutboundFrame::Close) {
                    warn!("Could not queue close frame ({}): {}", self.key, e);
                }
            }
        }

        if let Some(mut writer) = self.writer.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
                warn!("Writer did not finish within {:?}, aborting", CLOSE_TIMEOUT);
                writer.abort();
            }
        }

        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        info!("Disconnected from backend WebSocket ({})", self.key);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
