use super::connection::{Connection, Connector, SendError, SessionEvent};
use super::key::SessionKey;
use super::stats::SessionStats;
use crate::config::ServerConfig;
use crate::protocol::OutboundFrame;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// The current conversation and, if it connected, its socket
struct Session {
    key: SessionKey,
    connection: Option<Connection>,
}

/// Keeps at most one connection open, replacing it whenever the session key changes
pub struct SessionController {
    server: ServerConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::Sender<SessionEvent>,
    current: Option<Session>,
    connections_opened: usize,
}

impl SessionController {
    pub fn new(
        server: ServerConfig,
        connector: Arc<dyn Connector>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            server,
            connector,
            events,
            current: None,
            connections_opened: 0,
        }
    }

    /// Make `key` the current session.
    ///
    /// The previous connection is closed before the new one is opened. A
    /// failed connect leaves the session in place without a socket; nothing
    /// retries until the key changes again.
    pub async fn open(&mut self, key: SessionKey) -> Result<()> {
        if let Some(current) = &self.current {
            if current.key == key && current.connection.as_ref().is_some_and(|c| c.is_open()) {
                return Ok(());
            }
        }

        self.teardown().await;

        let url = key.endpoint_url(&self.server);
        self.current = Some(Session {
            key: key.clone(),
            connection: None,
        });

        match self.connector.connect(&key, &url, self.events.clone()).await {
            Ok(connection) => {
                info!("Connected to backend WebSocket ({})", key);
                self.connections_opened += 1;
                if let Some(session) = self.current.as_mut() {
                    session.connection = Some(connection);
                }
                Ok(())
            }
            Err(e) => {
                error!("WebSocket error ({}): {:#}", key, e);
                Err(e)
            }
        }
    }

    /// Switch organization; a fresh request id is generated
    pub async fn change_organization(&mut self, organization: &str) -> Result<SessionKey> {
        let key = SessionKey::new(organization);
        self.open(key.clone()).await?;
        Ok(key)
    }

    /// Start a new conversation with the current organization
    pub async fn renew(&mut self) -> Result<Option<SessionKey>> {
        let Some(key) = self.key().map(SessionKey::renewed) else {
            return Ok(None);
        };
        self.open(key.clone()).await?;
        Ok(Some(key))
    }

    /// Close the current connection, if any, and forget the session
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.current = None;
    }

    async fn teardown(&mut self) {
        if let Some(connection) = self.current.as_mut().and_then(|s| s.connection.take()) {
            connection.close().await;
        }
    }

    pub fn send(&self, frame: OutboundFrame) -> Result<(), SendError> {
        match self.current.as_ref().and_then(|s| s.connection.as_ref()) {
            Some(connection) => connection.send(frame),
            None => Err(SendError::NotConnected),
        }
    }

    pub fn key(&self) -> Option<&SessionKey> {
        self.current.as_ref().map(|s| &s.key)
    }

    /// Whether an event belongs to the live session rather than a replaced one
    pub fn is_current(&self, key: &SessionKey) -> bool {
        self.key() == Some(key)
    }

    pub fn is_open(&self) -> bool {
        self.current
            .as_ref()
            .and_then(|s| s.connection.as_ref())
            .is_some_and(|c| c.is_open())
    }

    /// Total connections established over the controller's lifetime
    pub fn connections_opened(&self) -> usize {
        self.connections_opened
    }

    pub fn stats(&self) -> Option<SessionStats> {
        let session = self.current.as_ref()?;
        let connection = session.connection.as_ref()?;

        Some(SessionStats {
            organization: session.key.organization.clone(),
            request_id: session.key.request_id.to_string(),
            connected: connection.is_open(),
            opened_at: connection.opened_at(),
            frames_sent: connection.frames_sent(),
            audio_bytes_sent: connection.audio_bytes_sent(),
            frames_received: connection.frames_received(),
        })
    }
}
