pub mod counter;
pub mod dbs;
pub mod error;
pub mod models;
pub mod sequence;
pub mod trait_client;
#[cfg(feature = "mongodb")]
pub mod builder;

pub use counter::{CounterField, CounterUpdate};
pub use dbs::memory::MemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::{MongoOptions, MongoPersistenceClient};
#[cfg(feature = "mongodb")]
pub use builder::MongoPersistenceClientBuilder;
pub use error::{PersistError, Result};
pub use models::{Application, Chat, Message, NewApplication, NewMessage};
pub use sequence::{SequenceAllocator, SequenceScope};
pub use trait_client::PersistenceClient;
