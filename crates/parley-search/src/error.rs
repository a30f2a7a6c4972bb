use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Search index returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed search response: {0}")]
    Malformed(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Search unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
