use parley_types::PageRequest;
use serde_json::{json, Value};

use crate::error::{Result, SearchError};

/// Full-text query scoped to one chat, with its result window
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub application_token: String,
    pub chat_number: i64,
    pub text: String,
    pub offset: u64,
    pub limit: u64,
}

impl SearchQuery {
    /// Fails on a blank query text
    pub fn new(
        application_token: impl Into<String>,
        chat_number: i64,
        text: impl Into<String>,
        page: PageRequest,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query can't be blank".to_string()));
        }

        Ok(Self {
            application_token: application_token.into(),
            chat_number,
            text,
            offset: page.offset(),
            limit: page.limit(),
        })
    }

    /// Elasticsearch request body
    ///
    /// Both scope terms must match; the text is matched against the body and
    /// its edge n-gram sub-field with automatic fuzziness. Hits come back in
    /// message order rather than by score.
    pub fn to_body(&self) -> Value {
        json!({
            "query": {
                "bool": {
                    "must": [
                        { "term": { "application_token": self.application_token } },
                        { "term": { "chat_number": self.chat_number } },
                        {
                            "multi_match": {
                                "query": self.text,
                                "fields": ["body", "body.ngram"],
                                "type": "best_fields",
                                "fuzziness": "AUTO"
                            }
                        }
                    ]
                }
            },
            "from": self.offset,
            "size": self.limit,
            "sort": [
                { "message_number": { "order": "asc" } }
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_shape() {
        let query = SearchQuery::new("tok", 3, "hello", PageRequest::new(2, 10)).unwrap();

        assert_eq!(
            query.to_body(),
            json!({
                "query": { "bool": { "must": [
                    { "term": { "application_token": "tok" } },
                    { "term": { "chat_number": 3 } },
                    { "multi_match": {
                        "query": "hello",
                        "fields": ["body", "body.ngram"],
                        "type": "best_fields",
                        "fuzziness": "AUTO"
                    } }
                ] } },
                "from": 10,
                "size": 10,
                "sort": [ { "message_number": { "order": "asc" } } ]
            })
        );
    }

    #[test]
    fn test_blank_query_rejected() {
        let err = SearchQuery::new("tok", 1, "   ", PageRequest::default()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }
}
