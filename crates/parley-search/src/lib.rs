pub mod document;
pub mod elasticsearch;
pub mod error;
pub mod gateway;
pub mod index;
pub mod memory;
pub mod query;

// Re-export main types
pub use document::MessageDocument;
pub use elasticsearch::ElasticsearchClient;
pub use error::{Result, SearchError};
pub use gateway::SearchGateway;
pub use index::{SearchHits, SearchIndex};
pub use memory::MemorySearchIndex;
pub use query::SearchQuery;
