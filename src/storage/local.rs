//! Local filesystem backend.
//!
//! One JSON envelope per item under `{root}/items/`, named by the SHA-256 of
//! the key. Writes go to a temp file that is synced and then renamed over
//! the target, so a crash mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{Envelope, ItemBackend, ItemKey};

const ITEMS_DIR: &str = "items";
const TMP_SUFFIX: &str = ".tmp";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root_dir: PathBuf,
}

impl LocalBackend {
    /// Create a LocalBackend rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn items_dir(&self) -> PathBuf {
        self.root_dir.join(ITEMS_DIR)
    }

    /// Get the full path for an item key.
    fn path(&self, key: &ItemKey) -> PathBuf {
        self.items_dir().join(key.file_name())
    }

    /// Write bytes atomically (write to temp, sync, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// File names in the items directory; empty if it doesn't exist yet.
    async fn list(&self) -> Result<Vec<(String, PathBuf)>> {
        let dir = self.items_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::storage(dir.display().to_string(), e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::storage(dir.display().to_string(), e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                files.push((name.to_string(), entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ItemBackend for LocalBackend {
    async fn load_all(&self) -> Result<Vec<Envelope>> {
        let mut envelopes = Vec::new();

        for (name, path) in self.list().await? {
            if !name.ends_with(".json") {
                continue;
            }
            let Some(bytes) = Self::read_bytes(&path)
                .await
                .map_err(|e| AppError::storage(path.display().to_string(), e))?
            else {
                continue;
            };

            let envelope: Envelope = match serde_json::from_slice(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::warn!("Skipping unreadable item file {}: {}", path.display(), e);
                    continue;
                }
            };
            if envelope.key.file_name() != name {
                log::warn!(
                    "Skipping {}: stored key '{}' does not match file name",
                    path.display(),
                    envelope.key
                );
                continue;
            }
            envelopes.push(envelope);
        }

        log::debug!(
            "Loaded {} items from {}",
            envelopes.len(),
            self.items_dir().display()
        );
        Ok(envelopes)
    }

    async fn put(&self, envelope: &Envelope) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(envelope)?;
        self.write_bytes(&self.path(&envelope.key), &bytes)
            .await
            .map_err(|e| AppError::storage(envelope.key.as_str(), e))
    }

    async fn remove(&self, key: &ItemKey) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage(key.as_str(), e)),
        }
    }

    async fn cleanup(&self) -> Result<usize> {
        let mut removed = 0;
        for (name, path) in self.list().await? {
            if !name.ends_with(TMP_SUFFIX) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    log::info!("Removed interrupted write {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::storage(path.display().to_string(), e)),
            }
        }
        Ok(removed)
    }

    fn describe(&self) -> String {
        self.items_dir().display().to_string()
    }
}
