use std::sync::Arc;
use std::time::Duration;

use parley_cache::{CacheStore, EntityCache, EntityCacheConfig, MemoryCacheStore};
use parley_persist::{MemoryPersistenceClient, PersistenceClient};
use parley_search::{MemorySearchIndex, SearchGateway, SearchIndex};
use parley_types::PaginationPolicy;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Backends sit behind their trait objects so the same handlers run over
/// MongoDB/Elasticsearch in production and in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub cache: EntityCache,
    pub search: SearchGateway,
    pub pagination: PaginationPolicy,
    pub application_ttl: Duration,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        cache_store: Arc<dyn CacheStore>,
        search_index: Arc<dyn SearchIndex>,
    ) -> Self {
        let cache = EntityCache::new(
            cache_store,
            EntityCacheConfig {
                timeout: config.cache.timeout(),
                fail_open: config.cache.fail_open,
            },
        );

        Self {
            pagination: config.pagination,
            application_ttl: config.cache.ttl(),
            persist,
            cache,
            search: SearchGateway::new(search_index),
            config: Arc::new(config),
        }
    }

    /// State over in-memory store, cache and index
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryPersistenceClient::new()),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(MemorySearchIndex::new()),
        )
    }
}
