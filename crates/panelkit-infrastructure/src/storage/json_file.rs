//! File-backed [`StateStorage`]: one JSON file per key in a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::storage::StateStorage;

use super::atomic_file::AtomicFile;

/// Stores each key as `<dir>/<key>.json`.
///
/// With a non-zero `quota_bytes`, a write that would push the combined size
/// of all key files over the quota is rejected with `StorageQuotaExceeded`
/// and the previous value is kept.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
    quota_bytes: u64,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: 0,
        }
    }

    /// Limits the total bytes stored across all keys. 0 disables the limit.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<AtomicFile> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PanelkitError::validation(format!(
                "Invalid storage key: {key:?}"
            )));
        }
        Ok(AtomicFile::new(self.dir.join(format!("{key}.json"))))
    }

    /// Bytes used by every key file except `excluding`.
    fn used_bytes(dir: &Path, excluding: &Path) -> u64 {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let path = entry.path();
                path != excluding && path.extension().is_some_and(|ext| ext == "json")
            })
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PanelkitError::internal(format!("Storage task failed: {e}")))?
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let file = self.file_for(key)?;
        blocking(move || Ok(file.load()?)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let file = self.file_for(key)?;
        let dir = self.dir.clone();
        let quota = self.quota_bytes;
        let key = key.to_string();
        let value = value.to_string();

        blocking(move || {
            if quota > 0 {
                let projected = Self::used_bytes(&dir, file.path()) + value.len() as u64;
                if projected > quota {
                    tracing::warn!(key = %key, projected, quota, "Storage quota exceeded");
                    return Err(PanelkitError::quota_exceeded(
                        key,
                        format!("writing would use {projected} of {quota} bytes"),
                    ));
                }
            }
            file.save(&value).map_err(|e| match PanelkitError::from(e) {
                PanelkitError::StorageQuotaExceeded { message, .. } => {
                    PanelkitError::quota_exceeded(key.clone(), message)
                }
                other => other,
            })?;
            tracing::debug!(key = %key, bytes = value.len(), "Wrote storage key");
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let file = self.file_for(key)?;
        blocking(move || Ok(file.remove()?)).await
    }
}
