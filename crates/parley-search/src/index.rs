use async_trait::async_trait;

use crate::document::MessageDocument;
use crate::error::Result;
use crate::query::SearchQuery;

/// Total matches plus the documents in the requested window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub documents: Vec<MessageDocument>,
}

/// Full-text index holding message documents
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Run a scoped query; documents come back ascending by message number
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits>;

    /// Insert or replace one message document
    async fn index_message(&self, document: &MessageDocument) -> Result<()>;

    /// Create the index with its mapping if it does not exist yet
    async fn ensure_index(&self) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    /// Backend name for health reporting
    fn name(&self) -> &'static str;
}
