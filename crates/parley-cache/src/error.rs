use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for CacheError {
    fn from(err: mongodb::error::Error) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
