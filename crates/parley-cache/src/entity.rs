use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CacheError;
use crate::store::CacheStore;

/// Lifetime of a cached application lookup
pub const APPLICATION_TTL: Duration = Duration::from_secs(30 * 60);

/// Cache key for an application looked up by its public token
pub fn application_key(token: &str) -> String {
    format!("application:token:{}", token)
}

#[derive(Debug, Clone, Copy)]
pub struct EntityCacheConfig {
    /// Upper bound for every store call
    pub timeout: Duration,
    /// Serve from the loader when the store is down instead of failing
    pub fail_open: bool,
}

impl Default for EntityCacheConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            fail_open: true,
        }
    }
}

#[derive(Clone)]
pub struct EntityCache {
    store: Arc<dyn CacheStore>,
    config: EntityCacheConfig,
}

impl EntityCache {
    pub fn new(store: Arc<dyn CacheStore>, config: EntityCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn config(&self) -> EntityCacheConfig {
        self.config
    }

    /// Return the cached value for `key`, or run `loader` and cache its result.
    ///
    /// Loader errors propagate untouched and are never cached. Store failures
    /// are logged and skipped when failing open, returned otherwise.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.read(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => tracing::debug!(key, "Cache miss"),
            Err(err) => self.degrade(key, err)?,
        }

        let value = loader().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(err) = self.write(key, raw, ttl).await {
                    self.degrade(key, err)?;
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "Value not cacheable"),
        }

        Ok(value)
    }

    /// Store round-trip bounded by the configured timeout
    pub async fn health(&self) -> Result<(), CacheError> {
        self.bounded(self.store.ping()).await
    }

    pub async fn close(&self) -> Result<(), CacheError> {
        self.store.close().await
    }

    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(self.store.get(key)).await
    }

    async fn write(&self, key: &str, raw: String, ttl: Duration) -> Result<(), CacheError> {
        self.bounded(self.store.set(key, raw, ttl)).await
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T, CacheError>>) -> Result<T, CacheError> {
        tokio::time::timeout(self.config.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.config.timeout))?
    }

    fn degrade(&self, key: &str, err: CacheError) -> Result<(), CacheError> {
        if self.config.fail_open {
            tracing::warn!(
                key,
                store = self.store.name(),
                error = %err,
                "Cache store unavailable, bypassing"
            );
            Ok(())
        } else {
            tracing::error!(key, store = self.store.name(), error = %err, "Cache store unavailable");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_key() {
        assert_eq!(application_key("abc"), "application:token:abc");
    }

    #[test]
    fn test_application_ttl_is_thirty_minutes() {
        assert_eq!(APPLICATION_TTL.as_secs(), 1800);
    }
}
