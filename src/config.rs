use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub organizations: Vec<String>,
    pub recording: RecordingConfig,
    pub downloads: DownloadConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` of the chat backend
    pub host: String,
    /// Path prefix in front of `/<organization>/<request_id>`
    pub path: String,
    /// Upper bound on the TCP connect plus WebSocket handshake
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Seconds of audio packed into each binary frame
    pub chunk_interval_secs: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Where `chat_history.json` lands
    pub dir: PathBuf,
    /// Spool directory for received audio blobs
    pub blob_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Player program and arguments; the clip path is appended. Empty disables autoplay.
    pub command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            organizations: vec!["organization1".to_string(), "organization2".to_string()],
            recording: RecordingConfig::default(),
            downloads: DownloadConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            path: "/gpt-api/chat_stream".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            chunk_interval_secs: 7,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            blob_dir: std::env::temp_dir().join("voice-chat-blobs"),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            command: ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl RecordingConfig {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_secs(self.chunk_interval_secs)
    }
}

impl Config {
    /// Load from an optional file (any format the `config` crate knows), then
    /// `VOICE_CHAT__SECTION__KEY` environment overrides.
    /// `VOICE_CHAT__ORGANIZATIONS` takes a comma-separated list.
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like `load`, reading overrides from `env` instead of the process
    /// environment when given
    pub fn load_with_env(path: &str, env: Option<config::Map<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOICE_CHAT")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("organizations")
                    .source(env),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.organizations.is_empty() {
            bail!("At least one organization must be configured");
        }
        if self.server.connect_timeout_secs == 0 {
            bail!("server.connect_timeout_secs must be positive");
        }
        if self.recording.chunk_interval_secs == 0 {
            bail!("recording.chunk_interval_secs must be positive");
        }
        if self.recording.channels == 0 || self.recording.sample_rate == 0 {
            bail!("recording.sample_rate and recording.channels must be positive");
        }
        Ok(())
    }

    pub fn is_known_organization(&self, organization: &str) -> bool {
        self.organizations.iter().any(|o| o == organization)
    }

    pub fn default_organization(&self) -> &str {
        self.organizations
            .first()
            .map(String::as_str)
            .unwrap_or("organization1")
    }
}
