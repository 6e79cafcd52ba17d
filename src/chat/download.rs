use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CHAT_HISTORY_FILE: &str = "chat_history.json";

/// Write the server-provided history verbatim, pretty-printed, as `chat_history.json`
pub fn save_chat_history(dir: &Path, history: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create download directory {}", dir.display()))?;

    let path = dir.join(CHAT_HISTORY_FILE);
    let json = serde_json::to_string_pretty(history)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Chat history saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let history = json!({"metadata": {"number_of_requests": 1}, "messages": [{"sender": "user", "message": "hi"}]});

        let path = save_chat_history(&dir.path().join("nested"), &history).unwrap();

        assert!(path.ends_with(CHAT_HISTORY_FILE));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, serde_json::to_string_pretty(&history).unwrap());
        assert!(written.contains('\n'));
    }
}
