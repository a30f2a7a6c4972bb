use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::store::CacheStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(rename = "_id")]
    key: String,
    value: String,
    expires_at: BsonDateTime,
}

/// Store backed by a MongoDB collection with a TTL index on `expires_at`
///
/// The TTL monitor only sweeps periodically, so reads also filter on
/// `expires_at` to keep expiry strict.
pub struct MongoCacheStore {
    client: Client,
    db: Database,
    collection: Collection<CacheEntry>,
}

impl MongoCacheStore {
    pub async fn connect(mongodb_uri: &str, database: &str, collection: &str, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(mongodb_uri).await?;
        options.app_name = Some("parley-cache".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let db = client.database(database);
        let store = Self {
            collection: db.collection(collection),
            client,
            db,
        };

        store.ensure_ttl_index().await?;
        tracing::info!(database, collection, "Connected cache store to MongoDB");
        Ok(store)
    }

    async fn ensure_ttl_index(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(IndexOptions::builder().expire_after(Duration::ZERO).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

fn expiry(ttl: Duration) -> Result<BsonDateTime> {
    let at = SystemTime::now()
        .checked_add(ttl)
        .ok_or_else(|| CacheError::Unavailable(format!("ttl out of range: {:?}", ttl)))?;
    Ok(BsonDateTime::from_system_time(at))
}

#[async_trait]
impl CacheStore for MongoCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let filter = doc! {
            "_id": key,
            "expires_at": { "$gt": BsonDateTime::now() }
        };
        let entry = self.collection.find_one(filter).await?;
        Ok(entry.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            expires_at: expiry(ttl)?,
        };
        self.collection
            .replace_one(doc! { "_id": key }, entry)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        tracing::info!("Cache store connection closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_in_the_future() {
        let at = expiry(Duration::from_secs(1800)).unwrap();
        assert!(at > BsonDateTime::now());
    }

    #[test]
    fn test_entry_uses_key_as_id() {
        let entry = CacheEntry {
            key: "application:token:abc".into(),
            value: "{}".into(),
            expires_at: BsonDateTime::now(),
        };
        let doc = mongodb::bson::to_document(&entry).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), "application:token:abc");
    }
}
