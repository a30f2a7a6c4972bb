use std::time::Duration;

use crate::dbs::mongo::{MongoOptions, MongoPersistenceClient};
use crate::error::{PersistError, Result};

pub struct MongoPersistenceClientBuilder {
    mongodb_uri: Option<String>,
    database: Option<String>,
    options: MongoOptions,
    ensure_indexes: bool,
}

impl MongoPersistenceClientBuilder {
    pub fn new() -> Self {
        Self {
            mongodb_uri: None,
            database: None,
            options: MongoOptions::default(),
            ensure_indexes: true,
        }
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.options.max_pool_size = Some(size);
        self
    }

    /// Attempts per chat/message creation before a conflict is reported
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    pub fn ensure_indexes(mut self, ensure: bool) -> Self {
        self.ensure_indexes = ensure;
        self
    }

    pub async fn build(self) -> Result<MongoPersistenceClient> {
        let mongodb_uri = self
            .mongodb_uri
            .ok_or_else(|| PersistError::Internal("mongodb_uri is required".to_string()))?;
        let database = self
            .database
            .ok_or_else(|| PersistError::Internal("database is required".to_string()))?;

        let client = MongoPersistenceClient::connect(&mongodb_uri, &database, self.options).await?;
        if self.ensure_indexes {
            client.ensure_indexes().await?;
        }
        Ok(client)
    }
}

impl Default for MongoPersistenceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_uri() {
        let err = MongoPersistenceClientBuilder::new()
            .database("parley")
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PersistError::Internal(_)));
    }

    #[tokio::test]
    async fn test_build_requires_database() {
        let err = MongoPersistenceClientBuilder::new()
            .mongodb_uri("mongodb://localhost:27017")
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PersistError::Internal(_)));
    }
}
