use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::document::MessageDocument;
use crate::error::{Result, SearchError};
use crate::index::{SearchHits, SearchIndex};
use crate::query::SearchQuery;

pub const DEFAULT_INDEX: &str = "messages";

/// HTTP client for the Elasticsearch REST API
///
/// Every request is bounded by the client timeout. Non-2xx responses are
/// turned into [`SearchError::Status`] carrying the response body.
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
    index: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    total: Option<Total>,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// `hits.total` is an object on 7.x+ and a bare number before that
#[derive(Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: MessageDocument,
}

impl ElasticsearchClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - cluster URL (e.g., "http://elasticsearch:9200")
    /// * `index` - index holding message documents
    /// * `timeout` - per-request timeout
    pub fn new(base_url: impl Into<String>, index: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Index mapping: `body` is full text with an edge n-gram sub-field for
    /// partial matches; the scope fields are exact
    pub fn index_definition() -> Value {
        json!({
            "settings": {
                "analysis": {
                    "analyzer": {
                        "partial_analyzer": {
                            "type": "custom",
                            "tokenizer": "standard",
                            "filter": ["lowercase", "edge_ngram_filter"]
                        }
                    },
                    "filter": {
                        "edge_ngram_filter": {
                            "type": "edge_ngram",
                            "min_gram": 2,
                            "max_gram": 20
                        }
                    }
                }
            },
            "mappings": {
                "properties": {
                    "application_token": { "type": "keyword" },
                    "chat_number": { "type": "integer" },
                    "message_number": { "type": "integer" },
                    "body": {
                        "type": "text",
                        "fields": {
                            "ngram": {
                                "type": "text",
                                "analyzer": "partial_analyzer",
                                "search_analyzer": "standard"
                            }
                        }
                    },
                    "created_at": { "type": "date" }
                }
            }
        })
    }

    /// Handle API response
    async fn handle_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            tracing::debug!(status = %status, "Elasticsearch request successful");
            Ok(response)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".to_string());

            Err(SearchError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits> {
        let url = self.url(&format!("{}/_search", self.index));

        let response = self.client.post(&url).json(&query.to_body()).send().await?;
        let response = self.handle_response(response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let total = match parsed.hits.total {
            Some(Total::Object { value }) | Some(Total::Count(value)) => value,
            None => 0,
        };

        Ok(SearchHits {
            total,
            documents: parsed.hits.hits.into_iter().map(|hit| hit.source).collect(),
        })
    }

    async fn index_message(&self, document: &MessageDocument) -> Result<()> {
        let url = self.url(&format!("{}/_doc/{}", self.index, document.doc_id()));

        let response = self.client.put(&url).json(document).send().await?;
        self.handle_response(response).await?;
        Ok(())
    }

    async fn ensure_index(&self) -> Result<()> {
        let url = self.url(&self.index);

        let response = self.client.head(&url).send().await?;
        if response.status() == StatusCode::OK {
            tracing::info!(index = %self.index, "Search index already exists");
            return Ok(());
        }

        let response = self
            .client
            .put(&url)
            .json(&Self::index_definition())
            .send()
            .await?;
        self.handle_response(response).await?;

        tracing::info!(index = %self.index, "Created search index");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.client.get(self.url("_cluster/health")).send().await?;
        self.handle_response(response).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }
}
