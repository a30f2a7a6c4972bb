use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_cache::{
    application_key, CacheError, CacheStore, EntityCache, EntityCacheConfig, MemoryCacheStore,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct App {
    token: String,
    name: String,
}

#[derive(Debug)]
enum LookupError {
    NotFound,
    Cache(CacheError),
}

impl From<CacheError> for LookupError {
    fn from(err: CacheError) -> Self {
        LookupError::Cache(err)
    }
}

fn app() -> App {
    App {
        token: "abc".into(),
        name: "support".into(),
    }
}

fn cache_over(store: Arc<dyn CacheStore>, fail_open: bool) -> EntityCache {
    EntityCache::new(
        store,
        EntityCacheConfig {
            timeout: Duration::from_millis(100),
            fail_open,
        },
    )
}

async fn load(cache: &EntityCache, ttl: Duration, calls: &AtomicUsize) -> Result<App, LookupError> {
    cache
        .get_or_load(&application_key("abc"), ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(app())
        })
        .await
}

/// Store whose every call fails
struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> parley_cache::Result<Option<String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> parley_cache::Result<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> parley_cache::Result<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn close(&self) -> parley_cache::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Store that never answers
struct HangingStore;

#[async_trait]
impl CacheStore for HangingStore {
    async fn get(&self, _key: &str) -> parley_cache::Result<Option<String>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> parley_cache::Result<()> {
        std::future::pending().await
    }

    async fn ping(&self) -> parley_cache::Result<()> {
        std::future::pending().await
    }

    async fn close(&self) -> parley_cache::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

#[tokio::test]
async fn loads_once_then_serves_from_cache() {
    let cache = cache_over(Arc::new(MemoryCacheStore::new()), true);
    let calls = AtomicUsize::new(0);

    let first = load(&cache, Duration::from_secs(1800), &calls).await.unwrap();
    let second = load(&cache, Duration::from_secs(1800), &calls).await.unwrap();

    assert_eq!(first, app());
    assert_eq!(second, app());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reloads_after_expiry() {
    let cache = cache_over(Arc::new(MemoryCacheStore::new()), true);
    let calls = AtomicUsize::new(0);
    let ttl = Duration::from_millis(20);

    load(&cache, ttl, &calls).await.unwrap();
    load(&cache, ttl, &calls).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    load(&cache, ttl, &calls).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn not_found_is_never_cached() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = cache_over(store.clone(), true);
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let result: Result<App, LookupError> = cache
            .get_or_load(&application_key("missing"), Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LookupError::NotFound)
            })
            .await;
        assert!(matches!(result, Err(LookupError::NotFound)));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.is_empty());
}

#[tokio::test]
async fn undecodable_entry_is_a_miss_and_gets_overwritten() {
    let store = Arc::new(MemoryCacheStore::new());
    let key = application_key("abc");
    store
        .set(&key, "not json".into(), Duration::from_secs(60))
        .await
        .unwrap();

    let cache = cache_over(store.clone(), true);
    let calls = AtomicUsize::new(0);
    assert_eq!(load(&cache, Duration::from_secs(60), &calls).await.unwrap(), app());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let raw = store.get(&key).await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<App>(&raw).unwrap(), app());
}

#[tokio::test]
async fn broken_store_fails_open() {
    let cache = cache_over(Arc::new(BrokenStore), true);
    let calls = AtomicUsize::new(0);

    assert_eq!(load(&cache, Duration::from_secs(60), &calls).await.unwrap(), app());
    assert_eq!(load(&cache, Duration::from_secs(60), &calls).await.unwrap(), app());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn broken_store_fails_closed() {
    let cache = cache_over(Arc::new(BrokenStore), false);
    let calls = AtomicUsize::new(0);

    let err = load(&cache, Duration::from_secs(60), &calls).await.unwrap_err();
    assert!(matches!(err, LookupError::Cache(CacheError::Unavailable(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hanging_store_times_out() {
    let cache = cache_over(Arc::new(HangingStore), false);
    let calls = AtomicUsize::new(0);

    let err = load(&cache, Duration::from_secs(60), &calls).await.unwrap_err();
    assert!(matches!(err, LookupError::Cache(CacheError::Timeout(_))));

    let open = cache_over(Arc::new(HangingStore), true);
    assert_eq!(load(&open, Duration::from_secs(60), &calls).await.unwrap(), app());
    assert!(open.health().await.is_err());
}
