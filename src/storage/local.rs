//! Local filesystem storage implementation.
//!
//! Used for development and the CLI. Each key maps to one JSON file under
//! the root directory; writes go through a temp file and a rename so a
//! crashed run never leaves a half-written snapshot behind.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── listings.json         # Snapshot of the last run
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::storage::{Snapshot, SnapshotStore};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{key}.json"))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let snapshot: Option<Snapshot> = self
            .read_json(key)
            .await
            .map_err(|e| AppError::store(format!("reading {}: {}", self.path(key).display(), e)))?;

        if snapshot.is_none() {
            log::warn!("No snapshot found at {}", self.path(key).display());
        }
        Ok(snapshot)
    }

    async fn put(&self, key: &str, listings: &[Listing]) -> Result<Snapshot> {
        let snapshot = Snapshot::new(listings.to_vec());
        self.write_json(key, &snapshot)
            .await
            .map_err(|e| AppError::store(format!("writing {}: {}", self.path(key).display(), e)))?;

        log::info!(
            "Snapshot: {} listings written to {}",
            snapshot.listings.len(),
            self.path(key).display()
        );
        Ok(snapshot)
    }
}
