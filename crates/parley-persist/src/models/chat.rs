use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Database-agnostic chat model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub application_id: String,
    pub number: i64,
    pub messages_count: i64,
    /// Highest message number ever handed out under this chat
    pub last_message_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
