use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::{PersistError, Result};

/// Database-agnostic message model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub number: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    pub body: Option<String>,
}

impl NewMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: Some(body.into()) }
    }

    pub fn validate(&self) -> Result<&str> {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => Ok(body),
            _ => Err(PersistError::Validation("body can't be blank".to_string())),
        }
    }
}
