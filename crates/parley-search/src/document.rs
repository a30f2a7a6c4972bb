use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message as stored in the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDocument {
    pub application_token: String,
    pub chat_number: i64,
    pub message_number: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl MessageDocument {
    /// Stable document id, so re-indexing a message overwrites it
    pub fn doc_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.application_token, self.chat_number, self.message_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id() {
        let doc = MessageDocument {
            application_token: "abc".into(),
            chat_number: 2,
            message_number: 7,
            body: "hi".into(),
            created_at: Utc::now(),
        };
        assert_eq!(doc.doc_id(), "abc:2:7");
    }
}
