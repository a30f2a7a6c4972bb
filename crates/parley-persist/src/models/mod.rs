mod application;
mod chat;
mod message;

// Export database-agnostic models
pub use application::{generate_token, Application, NewApplication};
pub use chat::Chat;
pub use message::{Message, NewMessage};
