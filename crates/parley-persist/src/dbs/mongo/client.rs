use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::UNKNOWN_TRANSACTION_COMMIT_RESULT,
    options::ClientOptions,
    Client, ClientSession, Database,
};

use crate::counter::{CounterField, CounterUpdate};
use crate::dbs::mongo::models::{to_bson_datetime, MongoApplication, MongoChat, MongoMessage};
use crate::dbs::mongo::repositories::{
    MongoApplicationRepository, MongoChatRepository, MongoMessageRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{generate_token, Application, Chat, Message, NewApplication, NewMessage};
use crate::sequence::{SequenceAllocator, SequenceScope};
use crate::trait_client::PersistenceClient;

/// Connection tuning for [`MongoPersistenceClient`]
#[derive(Debug, Clone)]
pub struct MongoOptions {
    pub timeout: Duration,
    pub max_pool_size: Option<u32>,
    pub max_attempts: u32,
}

impl Default for MongoOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_pool_size: None,
            max_attempts: crate::sequence::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// MongoDB-backed store; chat and message creation run in multi-document
/// transactions, which need a replica set or sharded cluster
pub struct MongoPersistenceClient {
    client: Client,
    db: Database,
    applications: MongoApplicationRepository,
    chats: MongoChatRepository,
    messages: MongoMessageRepository,
    allocator: SequenceAllocator,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str, options: MongoOptions) -> Result<Self> {
        let mut client_options = ClientOptions::parse(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;
        client_options.app_name = Some("parley".to_string());
        client_options.connect_timeout = Some(options.timeout);
        client_options.server_selection_timeout = Some(options.timeout);
        if let Some(size) = options.max_pool_size {
            client_options.max_pool_size = Some(size);
        }

        let client = Client::with_options(client_options)
            .map_err(|e| PersistError::Connection(e.to_string()))?;
        let db = client.database(database);

        let store = Self {
            applications: MongoApplicationRepository::new(&db),
            chats: MongoChatRepository::new(&db),
            messages: MongoMessageRepository::new(&db),
            allocator: SequenceAllocator::new(options.max_attempts),
            client,
            db,
        };

        tracing::info!(database, "Connected to MongoDB");
        Ok(store)
    }

    /// Create the unique indexes the numbering relies on
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.applications.ensure_indexes().await?;
        self.chats.ensure_indexes().await?;
        self.messages.ensure_indexes().await?;
        Ok(())
    }

    async fn application(&self, token: &str) -> Result<MongoApplication> {
        self.applications
            .find_by_token(token)
            .await?
            .ok_or_else(|| PersistError::ApplicationNotFound(token.to_string()))
    }

    async fn chat(&self, token: &str, number: i64) -> Result<MongoChat> {
        let application = self.application(token).await?;
        self.chats
            .find(application.id, number)
            .await?
            .ok_or_else(|| chat_not_found(token, number))
    }

    async fn start_transaction(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(session)
    }

    /// Commit on success, abort on failure
    async fn finish<T>(&self, mut session: ClientSession, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                let mut budget = CommitBudget::new(self.allocator.max_attempts());
                loop {
                    match session.commit_transaction().await {
                        Ok(()) => break,
                        Err(e)
                            if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                                && budget.try_again() =>
                        {
                            tracing::debug!(error = %e, attempt = budget.attempt(), "Commit result unknown, re-committing");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::debug!(error = %abort_err, "Abort after failed transaction also failed");
                }
                Err(err)
            }
        }
    }

    async fn create_chat_once(&self, token: &str) -> Result<Chat> {
        let mut session = self.start_transaction().await?;
        let result = self.insert_chat(&mut session, token).await;
        self.finish(session, result).await
    }

    async fn insert_chat(&self, session: &mut ClientSession, token: &str) -> Result<Chat> {
        let before = self
            .applications
            .bump_chat_sequence(session, token, CounterUpdate::increment(CounterField::ChatsCount))
            .await?
            .ok_or_else(|| PersistError::ApplicationNotFound(token.to_string()))?;

        let number = SequenceAllocator::next_after(before.last_chat_number)?;
        let now = to_bson_datetime(Utc::now());
        let chat = MongoChat {
            id: ObjectId::new(),
            application_id: before.id,
            number,
            messages_count: 0,
            last_message_number: 0,
            created_at: now,
            updated_at: now,
        };

        self.chats.insert(session, &chat).await?;
        Ok(chat.into())
    }

    async fn create_message_once(
        &self,
        application_id: ObjectId,
        token: &str,
        chat_number: i64,
        body: &str,
    ) -> Result<Message> {
        let mut session = self.start_transaction().await?;
        let result = self
            .insert_message(&mut session, application_id, token, chat_number, body)
            .await;
        self.finish(session, result).await
    }

    async fn insert_message(
        &self,
        session: &mut ClientSession,
        application_id: ObjectId,
        token: &str,
        chat_number: i64,
        body: &str,
    ) -> Result<Message> {
        let before = self
            .chats
            .bump_message_sequence(
                session,
                application_id,
                chat_number,
                CounterUpdate::increment(CounterField::MessagesCount),
            )
            .await?
            .ok_or_else(|| chat_not_found(token, chat_number))?;

        let number = SequenceAllocator::next_after(before.last_message_number)?;
        let now = to_bson_datetime(Utc::now());
        let message = MongoMessage {
            id: ObjectId::new(),
            chat_id: before.id,
            number,
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.messages.insert(session, &message).await?;
        Ok(message.into())
    }

    async fn delete_chat_once(&self, application_id: ObjectId, token: &str, number: i64) -> Result<()> {
        let mut session = self.start_transaction().await?;
        let result = self
            .remove_chat(&mut session, application_id, token, number)
            .await;
        self.finish(session, result).await
    }

    async fn remove_chat(
        &self,
        session: &mut ClientSession,
        application_id: ObjectId,
        token: &str,
        number: i64,
    ) -> Result<()> {
        let chat = self
            .chats
            .delete(session, application_id, number)
            .await?
            .ok_or_else(|| chat_not_found(token, number))?;

        let removed = self.messages.delete_for_chat(session, chat.id).await?;
        self.applications
            .adjust_counter(
                session,
                application_id,
                CounterUpdate::decrement(CounterField::ChatsCount),
            )
            .await?;

        tracing::debug!(application_token = token, chat_number = number, messages = removed, "Deleted chat");
        Ok(())
    }
}

/// Bounds how many times a commit with an unknown outcome is re-sent
#[derive(Debug, Clone, Copy)]
struct CommitBudget {
    max_attempts: u32,
    attempt: u32,
}

impl CommitBudget {
    fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt: 1,
        }
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Claim another commit attempt; false once the budget is spent
    fn try_again(&mut self) -> bool {
        if self.attempt >= self.max_attempts {
            return false;
        }
        self.attempt += 1;
        true
    }
}

fn chat_not_found(token: &str, number: i64) -> PersistError {
    PersistError::ChatNotFound {
        application_token: token.to_string(),
        number,
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn create_application(&self, input: NewApplication) -> Result<Application> {
        let name = input.validate()?;

        // A token collision surfaces as a duplicate key and is re-run with a fresh token
        self.allocator
            .retry("application token", move || async move {
                let now = to_bson_datetime(Utc::now());
                let application = MongoApplication {
                    id: ObjectId::new(),
                    token: generate_token(),
                    name: name.to_string(),
                    chats_count: 0,
                    last_chat_number: 0,
                    created_at: now,
                    updated_at: now,
                };
                self.applications.insert(&application).await?;
                Ok(application.into())
            })
            .await
    }

    async fn count_applications(&self) -> Result<u64> {
        self.applications.count().await
    }

    async fn list_applications(&self, offset: u64, limit: u64) -> Result<Vec<Application>> {
        let applications = self.applications.list(offset, limit).await?;
        Ok(applications.into_iter().map(Into::into).collect())
    }

    async fn find_application(&self, token: &str) -> Result<Application> {
        Ok(self.application(token).await?.into())
    }

    async fn create_chat(&self, application_token: &str) -> Result<Chat> {
        let scope = SequenceScope::application(application_token);
        self.allocator
            .run(&scope, || self.create_chat_once(application_token))
            .await
    }

    async fn find_chat(&self, application_token: &str, number: i64) -> Result<Chat> {
        Ok(self.chat(application_token, number).await?.into())
    }

    async fn count_chats(&self, application_token: &str) -> Result<u64> {
        let application = self.application(application_token).await?;
        self.chats.count(application.id).await
    }

    async fn list_chats(&self, application_token: &str, offset: u64, limit: u64) -> Result<Vec<Chat>> {
        let application = self.application(application_token).await?;
        let chats = self.chats.list(application.id, offset, limit).await?;
        Ok(chats.into_iter().map(Into::into).collect())
    }

    async fn delete_chat(&self, application_token: &str, number: i64) -> Result<()> {
        let application = self.application(application_token).await?;
        let scope = SequenceScope::application(application_token);
        self.allocator
            .run(&scope, || self.delete_chat_once(application.id, application_token, number))
            .await
    }

    async fn create_message(
        &self,
        application_token: &str,
        chat_number: i64,
        input: NewMessage,
    ) -> Result<Message> {
        let body = input.validate()?;
        let application = self.application(application_token).await?;

        let scope = SequenceScope::chat(application_token, chat_number);
        self.allocator
            .run(&scope, || {
                self.create_message_once(application.id, application_token, chat_number, body)
            })
            .await
    }

    async fn count_messages(&self, application_token: &str, chat_number: i64) -> Result<u64> {
        let chat = self.chat(application_token, chat_number).await?;
        self.messages.count(chat.id).await
    }

    async fn list_messages(
        &self,
        application_token: &str,
        chat_number: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let chat = self.chat(application_token, chat_number).await?;
        let messages = self.messages.list(chat.id, offset, limit).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_budget_stops_after_max_attempts() {
        let mut budget = CommitBudget::new(3);
        assert!(budget.try_again());
        assert!(budget.try_again());
        assert!(!budget.try_again());
        assert!(!budget.try_again());
        assert_eq!(budget.attempt(), 3);
    }

    #[test]
    fn test_commit_budget_of_zero_allows_single_commit() {
        let mut budget = CommitBudget::new(0);
        assert!(!budget.try_again());
        assert_eq!(budget.attempt(), 1);
    }
}
