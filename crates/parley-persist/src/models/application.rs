use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::{PersistError, Result};

/// Database-agnostic application model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub token: String,
    pub name: String,
    pub chats_count: i64,
    /// Highest chat number ever handed out under this application
    pub last_chat_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation input; `name` is optional here so a missing field reaches validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewApplication {
    pub name: Option<String>,
}

impl NewApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// Returns the validated name
    pub fn validate(&self) -> Result<&str> {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(PersistError::Validation("name can't be blank".to_string())),
        }
    }
}

/// Opaque public token for a new application
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
