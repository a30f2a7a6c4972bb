use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Key/value store holding serialized entries with a per-entry TTL
///
/// A store is opened at startup, shared behind an `Arc`, and closed once
/// during shutdown. Expired entries must never be returned by `get`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Backend name for health reporting
    fn name(&self) -> &'static str;
}
