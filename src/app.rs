//! The client event loop
//!
//! One task owns all UI state. Socket events, recorder chunks, finished
//! playbacks and user commands arrive on channels and are handled one at a
//! time, so nothing here needs a lock.

use crate::audio::{AudioBackendConfig, AudioBackendFactory, AudioChunk, AudioSource, ChunkConfig};
use crate::chat::{render, Alerter, AudioPlayer, AudioRef, BlobStore, ChatState, Message, Sender};
use crate::config::Config;
use crate::protocol::{OutboundFrame, Signal};
use crate::recording::{ClipRecorder, ClipStatus, Recorder};
use crate::session::{ConnectionEvent, Connector, SendError, SessionController, SessionEvent, SessionKey};
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A user action
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Type `text` into the input and press send
    Say(String),
    SelectOrganization(String),
    /// Fresh request id, same organization
    NewConversation,
    SendDocument,
    SendImage,
    DownloadHistory,
    StartRecording,
    StopRecording,
    StartClip,
    StopClip,
    /// Re-render the whole conversation
    Show,
    Status,
    Quit,
}

impl Command {
    /// Parse one input line. Lines starting with `/` are commands, anything
    /// else is chat text; blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Some(Command::Say(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "org" if !arg.is_empty() => Command::SelectOrganization(arg.to_string()),
            "new" => Command::NewConversation,
            "doc" => Command::SendDocument,
            "image" => Command::SendImage,
            "history" => Command::DownloadHistory,
            "record" => Command::StartRecording,
            "stop" => Command::StopRecording,
            "clip" => Command::StartClip,
            "clipstop" => Command::StopClip,
            "show" => Command::Show,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            // Unknown commands go out as plain text
            _ => Command::Say(trimmed.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Command(Command),
    Session(SessionEvent),
    Chunk(AudioChunk),
    PlaybackFinished(AudioRef),
}

/// External seams of the client
pub struct AppDeps {
    pub connector: Arc<dyn Connector>,
    pub alerter: Arc<dyn Alerter>,
    pub player: Arc<dyn AudioPlayer>,
    pub capture: AudioSource,
}

pub struct App {
    config: Config,
    controller: SessionController,
    chat: ChatState,
    input: String,
    recorder: Recorder,
    clip: ClipRecorder,
    capture: AudioSource,
    session_rx: mpsc::Receiver<SessionEvent>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    chunk_rx: mpsc::Receiver<AudioChunk>,
    playback_rx: mpsc::Receiver<AudioRef>,
    rendered: usize,
    output: Vec<String>,
}

impl App {
    pub fn new(config: Config, deps: AppDeps) -> Self {
        let (session_tx, session_rx) = mpsc::channel(256);
        let (chunk_tx, chunk_rx) = mpsc::channel(16);
        let (playback_tx, playback_rx) = mpsc::channel(16);

        let controller = SessionController::new(config.server.clone(), deps.connector, session_tx);
        let chat = ChatState::new(
            config.downloads.dir.clone(),
            BlobStore::new(config.downloads.blob_dir.clone()),
            deps.alerter,
            deps.player,
            playback_tx,
        );
        let recorder = Recorder::new(ChunkConfig {
            chunk_duration: config.recording.chunk_interval(),
        });

        Self {
            config,
            controller,
            chat,
            input: String::new(),
            recorder,
            clip: ClipRecorder::new(),
            capture: deps.capture,
            session_rx,
            chunk_tx,
            chunk_rx,
            playback_rx,
            rendered: 0,
            output: Vec::new(),
        }
    }

    /// Open the first session. A failed connect is logged and leaves the
    /// client without a socket until the organization changes.
    pub async fn connect(&mut self, organization: Option<&str>) -> Result<()> {
        let organization = organization
            .unwrap_or_else(|| self.config.default_organization())
            .to_string();
        if !self.config.is_known_organization(&organization) {
            bail!("Unknown organization: {}", organization);
        }

        if let Err(e) = self.controller.open(SessionKey::new(organization)).await {
            debug!("Initial connect failed: {:#}", e);
        }
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        self.chat.messages()
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn clip_status(&self) -> ClipStatus {
        self.clip.status()
    }

    /// Send the input buffer as a chat message and clear it. Blank input is ignored.
    pub fn send_message(&mut self) -> Result<(), SendError> {
        if self.input.trim().is_empty() {
            return Ok(());
        }

        self.controller.send(OutboundFrame::chat(self.input.clone()))?;
        let text = std::mem::take(&mut self.input);
        self.chat.push(Message::text(Sender::You, text));
        Ok(())
    }

    pub fn send_signal(&mut self, signal: Signal) -> Result<(), SendError> {
        self.controller.send(OutboundFrame::signal(signal))?;
        self.chat.push(Message::text(Sender::System, signal.system_note()));
        Ok(())
    }

    pub async fn select_organization(&mut self, organization: &str) -> Result<()> {
        if !self.config.is_known_organization(organization) {
            bail!(
                "Unknown organization {} (expected one of: {})",
                organization,
                self.config.organizations.join(", ")
            );
        }
        self.controller.change_organization(organization).await?;
        Ok(())
    }

    pub async fn new_conversation(&mut self) -> Result<()> {
        match self.controller.key() {
            Some(_) => {
                self.controller.renew().await?;
            }
            None => {
                let organization = self.config.default_organization().to_string();
                self.controller.change_organization(&organization).await?;
            }
        }
        Ok(())
    }

    fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.config.recording.sample_rate,
            target_channels: self.config.recording.channels,
            ..AudioBackendConfig::default()
        }
    }

    /// Start interval recording. If the microphone cannot be acquired the
    /// failure is logged and the client stays idle.
    pub async fn start_recording(&mut self) -> Result<()> {
        if self.recorder.is_recording() {
            warn!("Recording already started");
            return Ok(());
        }

        let result = match AudioBackendFactory::create(&self.capture, self.backend_config()) {
            Ok(backend) => self.recorder.start(backend, self.chunk_tx.clone()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Error accessing microphone: {:#}", e);
        }
        result
    }

    pub async fn stop_recording(&mut self) -> Result<()> {
        self.recorder.stop().await?;
        Ok(())
    }

    pub async fn start_clip(&mut self) -> Result<()> {
        let result = match AudioBackendFactory::create(&self.capture, self.backend_config()) {
            Ok(backend) => self.clip.start(backend).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Error accessing microphone: {:#}", e);
        }
        result
    }

    /// Stop the clip recorder and send the take, if the socket is open
    pub async fn stop_clip(&mut self) -> Result<()> {
        let Some(wav) = self.clip.stop().await? else {
            return Ok(());
        };

        if !self.controller.is_open() {
            warn!("Discarding recorded clip: no open connection");
            return Ok(());
        }

        if let Err(e) = self.controller.send(OutboundFrame::Audio(wav)) {
            warn!("Failed to send recorded clip: {}", e);
        }
        Ok(())
    }

    /// Wait for the next socket, recorder or playback event
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        tokio::select! {
            Some(event) = self.session_rx.recv() => Some(AppEvent::Session(event)),
            Some(chunk) = self.chunk_rx.recv() => Some(AppEvent::Chunk(chunk)),
            Some(audio) = self.playback_rx.recv() => Some(AppEvent::PlaybackFinished(audio)),
            else => None,
        }
    }

    /// Apply one event. Returns false once the user asked to quit.
    pub async fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Command(command) => return self.handle_command(command).await,
            AppEvent::Session(event) => self.handle_session_event(event),
            AppEvent::Chunk(chunk) => {
                if chunk.wav.is_empty() {
                    return true;
                }
                let index = chunk.metadata.chunk_index;
                if let Err(e) = self.controller.send(OutboundFrame::Audio(chunk.wav)) {
                    warn!("Dropping audio chunk {}: {}", index, e);
                }
            }
            AppEvent::PlaybackFinished(audio) => self.chat.playback_finished(&audio),
        }
        true
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        if !self.controller.is_current(&event.key) {
            debug!("Ignoring event from replaced session {}", event.key);
            return;
        }

        match event.event {
            ConnectionEvent::Opened => info!("Connected to backend WebSocket"),
            ConnectionEvent::Closed => info!("Disconnected from backend WebSocket"),
            ConnectionEvent::Error(e) => error!("WebSocket error: {}", e),
            ConnectionEvent::Frame(frame) => {
                if let Err(e) = self.chat.handle_frame(frame) {
                    error!("Failed to handle inbound frame: {:#}", e);
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> bool {
        let result = match command {
            Command::Say(text) => {
                self.set_input(text);
                self.send_message().map_err(Into::into)
            }
            Command::SelectOrganization(organization) => self.select_organization(&organization).await,
            Command::NewConversation => self.new_conversation().await,
            Command::SendDocument => self.send_signal(Signal::Document).map_err(Into::into),
            Command::SendImage => self.send_signal(Signal::Image).map_err(Into::into),
            Command::DownloadHistory => self.send_signal(Signal::DownloadHistory).map_err(Into::into),
            // Failures are already logged where they happen
            Command::StartRecording => self.start_recording().await.or(Ok(())),
            Command::StopRecording => self.stop_recording().await,
            Command::StartClip => self.start_clip().await.or(Ok(())),
            Command::StopClip => self.stop_clip().await,
            Command::Show => {
                self.output.push(render::render(self.chat.messages()));
                self.rendered = self.chat.messages().len();
                Ok(())
            }
            Command::Status => {
                self.output.push(self.status_report());
                Ok(())
            }
            Command::Quit => return false,
        };

        if let Err(e) = result {
            error!("{:#}", e);
        }
        true
    }

    fn status_report(&self) -> String {
        let recording = format!(
            "recording: {}, clip: {}",
            self.recorder.is_recording(),
            self.clip.status()
        );
        match self.controller.stats() {
            Some(stats) => match serde_json::to_string_pretty(&stats) {
                Ok(json) => format!("{}\n{}", json, recording),
                Err(e) => format!("stats unavailable: {}\n{}", e, recording),
            },
            None => format!("not connected\n{}", recording),
        }
    }

    /// Everything that should be printed since the last call
    pub fn take_output(&mut self) -> Option<String> {
        let messages = self.chat.messages();
        if self.rendered < messages.len() {
            self.output.push(render::render(&messages[self.rendered..]));
            self.rendered = messages.len();
        }

        if self.output.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.output).join("\n"))
        }
    }

    /// Drive the client until `commands` closes or the user quits
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        loop {
            let event = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => AppEvent::Command(command),
                    None => break,
                },
                Some(event) = self.next_event() => event,
            };

            if !self.handle_event(event).await {
                break;
            }

            if let Some(out) = self.take_output() {
                println!("{}", out);
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop any capture and close the socket
    pub async fn shutdown(&mut self) {
        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.stop().await {
                error!("Failed to stop recording: {:#}", e);
            }
        }
        if let Err(e) = self.clip.stop().await {
            error!("Failed to stop clip recorder: {:#}", e);
        }
        self.controller.shutdown().await;
        info!("Client shut down");
    }
}
