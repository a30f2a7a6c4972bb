use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Chat {number} not found in application {application_token}")]
    ChatNotFound {
        application_token: String,
        number: i64,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Concurrent writers collided on the same parent; the unit of work can be re-run
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PersistError::ApplicationNotFound(_) | PersistError::ChatNotFound { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::WriteConflict(_))
    }
}

#[cfg(feature = "mongodb")]
const DUPLICATE_KEY: i32 = 11000;

#[cfg(feature = "mongodb")]
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for PersistError {
    fn from(err: mongodb::error::Error) -> Self {
        if err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR) || is_duplicate_key(&err) {
            PersistError::WriteConflict(err.to_string())
        } else {
            PersistError::Database(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
