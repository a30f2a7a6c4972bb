use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Application, Chat, Message, NewApplication, NewMessage};

/// Storage operations for applications, chats and messages
///
/// Listings take an already-computed offset/limit window. Applications are
/// returned newest first; chats and messages ascending by number. Creating
/// a chat or message allocates its number, bumps the parent's count and
/// inserts the child as one unit of work.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Validate and store a new application under a freshly generated token
    async fn create_application(&self, input: NewApplication) -> Result<Application>;

    async fn count_applications(&self) -> Result<u64>;

    async fn list_applications(&self, offset: u64, limit: u64) -> Result<Vec<Application>>;

    /// Fails with `ApplicationNotFound` for an unknown token
    async fn find_application(&self, token: &str) -> Result<Application>;

    /// Create the next chat under an application
    async fn create_chat(&self, application_token: &str) -> Result<Chat>;

    async fn find_chat(&self, application_token: &str, number: i64) -> Result<Chat>;

    async fn count_chats(&self, application_token: &str) -> Result<u64>;

    async fn list_chats(&self, application_token: &str, offset: u64, limit: u64) -> Result<Vec<Chat>>;

    /// Delete a chat with its messages and decrement the application's count
    async fn delete_chat(&self, application_token: &str, number: i64) -> Result<()>;

    /// Validate and create the next message under a chat
    async fn create_message(
        &self,
        application_token: &str,
        chat_number: i64,
        input: NewMessage,
    ) -> Result<Message>;

    async fn count_messages(&self, application_token: &str, chat_number: i64) -> Result<u64>;

    async fn list_messages(
        &self,
        application_token: &str,
        chat_number: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>>;

    /// Round-trip to the backing store
    async fn ping(&self) -> Result<()>;
}
