use std::collections::HashMap;

use async_trait::async_trait;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::storage::StateStorage;
use tokio::sync::RwLock;

/// In-process [`StateStorage`], for tests and throwaway runs.
///
/// Applies the same quota rule as the file storage: the combined length of
/// all values may not exceed `quota_bytes` (0 means unlimited).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
    quota_bytes: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            values: RwLock::default(),
            quota_bytes,
        }
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        if self.quota_bytes > 0 {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let projected = (others + value.len()) as u64;
            if projected > self.quota_bytes {
                return Err(PanelkitError::quota_exceeded(
                    key,
                    format!("writing would use {projected} of {} bytes", self.quota_bytes),
                ));
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quota() {
        let storage = MemoryStorage::with_quota(4);
        storage.set("a", "12").await.unwrap();
        assert!(storage.set("b", "123").await.unwrap_err().is_quota_exceeded());
        assert!(storage.get("b").await.unwrap().is_none());
        storage.set("b", "34").await.unwrap();
    }
}
