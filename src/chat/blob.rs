use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Reference to a locally stored audio clip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioRef(Uuid);

impl AudioRef {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

/// Spool of received audio clips, one file per live reference
///
/// Clips stay on disk until released; whatever is left is removed when the
/// store is dropped.
#[derive(Debug)]
pub struct BlobStore {
    dir: PathBuf,
    live: HashMap<AudioRef, PathBuf>,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            live: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn create(&mut self, bytes: &[u8]) -> Result<AudioRef> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create blob directory {}", self.dir.display()))?;

        let audio = AudioRef(Uuid::new_v4());
        let path = self.dir.join(format!("{}.wav", audio.id()));
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write audio blob {}", path.display()))?;

        debug!("Created {} ({} bytes)", audio, bytes.len());
        self.live.insert(audio.clone(), path);
        Ok(audio)
    }

    pub fn path(&self, audio: &AudioRef) -> Option<&Path> {
        self.live.get(audio).map(PathBuf::as_path)
    }

    pub fn is_live(&self, audio: &AudioRef) -> bool {
        self.live.contains_key(audio)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Release a clip. Returns false if it was already released.
    pub fn revoke(&mut self, audio: &AudioRef) -> bool {
        match self.live.remove(audio) {
            Some(path) => {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
                debug!("Released {}", audio);
                true
            }
            None => false,
        }
    }
}

impl Drop for BlobStore {
    fn drop(&mut self) {
        for path in self.live.values() {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_revoke() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = BlobStore::new(dir.path());

        let audio = store.create(b"RIFF").unwrap();
        let path = store.path(&audio).unwrap().to_path_buf();
        assert!(path.exists());
        assert!(audio.to_string().starts_with("blob:"));

        assert!(store.revoke(&audio));
        assert!(!path.exists());
        assert!(!store.revoke(&audio));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn drop_removes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut store = BlobStore::new(dir.path());
            let audio = store.create(b"RIFF").unwrap();
            store.path(&audio).unwrap().to_path_buf()
        };
        assert!(!path.exists());
    }
}
