mod client;

pub use client::MemoryPersistenceClient;
