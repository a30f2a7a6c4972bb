//! Read-through caching for single-entity lookups.
//!
//! [`EntityCache`] sits in front of a [`CacheStore`] and a loader closure:
//! hits are decoded from JSON, misses run the loader and store its result
//! under a fixed TTL. Entries are never invalidated on write.

pub mod entity;
pub mod error;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod store;

pub use entity::{application_key, EntityCache, EntityCacheConfig, APPLICATION_TTL};
pub use error::{CacheError, Result};
pub use memory::MemoryCacheStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoCacheStore;
pub use store::CacheStore;
