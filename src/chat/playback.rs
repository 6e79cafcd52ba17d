use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Plays a stored clip to completion
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Runs an external player with the clip path appended
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: Vec<String>,
}

impl CommandPlayer {
    /// An empty command disables autoplay
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("Autoplay disabled");
        };

        let status = Command::new(program)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to launch {}", program))?;

        if !status.success() {
            bail!("{} exited with {}", program, status);
        }

        Ok(())
    }
}
