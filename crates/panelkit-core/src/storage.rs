//! Durable key-value storage abstraction.
//!
//! Session state is persisted under two keys, each holding a JSON document.
//! Implementations live in `panelkit-infrastructure`.

use async_trait::async_trait;

use crate::error::Result;

/// Key holding a JSON object mapping session id → session record.
pub const SESSIONS_KEY: &str = "sessions";

/// Key holding the active session id as a JSON string.
pub const CURRENT_SESSION_KEY: &str = "current_session";

/// An abstract durable key-value store.
///
/// # Implementation Notes
///
/// - `set` must be all-or-nothing: a failed write leaves the previous value intact.
/// - A write rejected for lack of space must surface as
///   `PanelkitError::StorageQuotaExceeded`.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Value found
    /// - `Ok(None)`: Nothing stored under `key`
    /// - `Err(_)`: Error occurred during retrieval
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
