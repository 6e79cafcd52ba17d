use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_chat::{App, AppDeps, AudioSource, Command, CommandPlayer, Config, TerminalAlerter, WebSocketConnector};

/// Terminal voice/text chat client
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/voice-chat")]
    config: String,

    /// Backend host:port, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Organization to open the first session with
    #[arg(short, long)]
    organization: Option<String>,

    /// Record from a WAV file instead of the microphone
    #[arg(long)]
    audio_file: Option<PathBuf>,

    /// Disable autoplay of audio replies
    #[arg(long)]
    no_autoplay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if args.no_autoplay {
        cfg.playback.command.clear();
    }

    info!("Voice chat v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}{}", cfg.server.host, cfg.server.path);
    info!("Organizations: {}", cfg.organizations.join(", "));

    let capture = match args.audio_file {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };

    let deps = AppDeps {
        connector: Arc::new(WebSocketConnector::new(cfg.server.connect_timeout())),
        alerter: Arc::new(TerminalAlerter),
        player: Arc::new(CommandPlayer::new(cfg.playback.command.clone())),
        capture,
    };

    let mut app = App::new(cfg, deps);
    app.connect(args.organization.as_deref()).await?;

    let (command_tx, command_rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(command) = Command::parse(&line) {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });

    app.run(command_rx).await
}
