//! Settings store trait for persisting small configuration records.

use async_trait::async_trait;

use crate::result::AppResult;

/// Durable key-value store owned by the host application.
///
/// Values are opaque strings (JSON in practice). The scheduler only
/// persists its configuration here; task records are never written.
#[async_trait]
pub trait SettingsStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key has never been set.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;
}
