use async_trait::async_trait;
use dashmap::DashMap;

use crate::document::MessageDocument;
use crate::error::Result;
use crate::index::{SearchHits, SearchIndex};
use crate::query::SearchQuery;

/// Process-local index for development and tests
///
/// Matching is a case-insensitive substring test on the body; there is no
/// fuzziness or scoring.
#[derive(Default)]
pub struct MemorySearchIndex {
    documents: DashMap<String, MessageDocument>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits> {
        let needle = query.text.to_lowercase();

        let mut matches: Vec<MessageDocument> = self
            .documents
            .iter()
            .filter(|entry| {
                let doc = entry.value();
                doc.application_token == query.application_token
                    && doc.chat_number == query.chat_number
                    && doc.body.to_lowercase().contains(&needle)
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|doc| doc.message_number);

        let total = matches.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        Ok(SearchHits {
            total,
            documents: matches.into_iter().skip(offset).take(limit).collect(),
        })
    }

    async fn index_message(&self, document: &MessageDocument) -> Result<()> {
        self.documents.insert(document.doc_id(), document.clone());
        Ok(())
    }

    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
