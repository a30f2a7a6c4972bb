use std::sync::Arc;

use parley_types::{PageRequest, SearchPage};

use crate::document::MessageDocument;
use crate::error::{Result, SearchError};
use crate::index::SearchIndex;
use crate::query::SearchQuery;

/// Entry point for message search
///
/// Builds the scoped query, runs it against the index and reshapes the hits
/// into a [`SearchPage`]. Index failures are logged here and reported as
/// [`SearchError::Unavailable`]; nothing is retried.
#[derive(Clone)]
pub struct SearchGateway {
    index: Arc<dyn SearchIndex>,
}

impl SearchGateway {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    pub fn backend(&self) -> &'static str {
        self.index.name()
    }

    pub async fn search(
        &self,
        application_token: &str,
        chat_number: i64,
        text: &str,
        page: PageRequest,
    ) -> Result<SearchPage<MessageDocument>> {
        let query = SearchQuery::new(application_token, chat_number, text, page)?;

        let hits = self.index.search(&query).await.map_err(|e| {
            tracing::error!(
                application_token,
                chat_number,
                backend = self.index.name(),
                error = %e,
                "Message search failed"
            );
            SearchError::Unavailable(e.to_string())
        })?;

        tracing::debug!(
            application_token,
            chat_number,
            total = hits.total,
            returned = hits.documents.len(),
            "Message search completed"
        );

        Ok(SearchPage {
            total: hits.total,
            results: hits.documents,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn index_message(&self, document: &MessageDocument) -> Result<()> {
        self.index.index_message(document).await.map_err(|e| {
            tracing::error!(
                doc_id = %document.doc_id(),
                backend = self.index.name(),
                error = %e,
                "Indexing message failed"
            );
            SearchError::Unavailable(e.to_string())
        })
    }

    pub async fn ensure_index(&self) -> Result<()> {
        self.index.ensure_index().await
    }

    pub async fn health(&self) -> Result<()> {
        self.index
            .health_check()
            .await
            .map_err(|e| SearchError::Unavailable(e.to_string()))
    }
}
