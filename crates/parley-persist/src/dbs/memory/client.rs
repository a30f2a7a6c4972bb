use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::counter::{CounterField, CounterUpdate};
use crate::error::{PersistError, Result};
use crate::models::{generate_token, Application, Chat, Message, NewApplication, NewMessage};
use crate::sequence::SequenceAllocator;
use crate::trait_client::PersistenceClient;

struct ChatRecord {
    chat: Chat,
    messages: BTreeMap<i64, Message>,
    /// Set once the chat has been unlinked from its application
    deleted: bool,
}

type SharedChat = Arc<Mutex<ChatRecord>>;

struct ApplicationRecord {
    application: Application,
    chats: BTreeMap<i64, SharedChat>,
}

/// Process-local store for development and tests
///
/// Applications and chats each sit behind their own async mutex. Chat
/// allocation serializes per application and message allocation per chat;
/// an application lock is never held while a chat lock is awaited.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    applications: DashMap<String, Arc<Mutex<ApplicationRecord>>>,
    ids: AtomicU64,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-padded hex ids sort in insertion order
    fn next_id(&self) -> String {
        format!("{:024x}", self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn record(&self, token: &str) -> Result<Arc<Mutex<ApplicationRecord>>> {
        self.applications
            .get(token)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PersistError::ApplicationNotFound(token.to_string()))
    }

    async fn chat(&self, application_token: &str, number: i64) -> Result<SharedChat> {
        let record = self.record(application_token)?;
        let guard = record.lock().await;
        guard
            .chats
            .get(&number)
            .map(Arc::clone)
            .ok_or_else(|| chat_not_found(application_token, number))
    }
}

fn chat_not_found(application_token: &str, number: i64) -> PersistError {
    PersistError::ChatNotFound {
        application_token: application_token.to_string(),
        number,
    }
}

fn window<T: Clone>(items: impl Iterator<Item = T>, offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.skip(offset).take(limit).collect()
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn create_application(&self, input: NewApplication) -> Result<Application> {
        let name = input.validate()?.to_string();
        let now = Utc::now();
        let application = Application {
            id: self.next_id(),
            token: generate_token(),
            name,
            chats_count: 0,
            last_chat_number: 0,
            created_at: now,
            updated_at: now,
        };

        let record = ApplicationRecord {
            application: application.clone(),
            chats: BTreeMap::new(),
        };

        match self.applications.entry(application.token.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(PersistError::ConstraintViolation(
                "token already taken".to_string(),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(record)));
                tracing::debug!(token = %application.token, "Created application");
                Ok(application)
            }
        }
    }

    async fn count_applications(&self) -> Result<u64> {
        Ok(self.applications.len() as u64)
    }

    async fn list_applications(&self, offset: u64, limit: u64) -> Result<Vec<Application>> {
        let records: Vec<_> = self
            .applications
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut applications = Vec::with_capacity(records.len());
        for record in records {
            applications.push(record.lock().await.application.clone());
        }
        applications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(window(applications.into_iter(), offset, limit))
    }

    async fn find_application(&self, token: &str) -> Result<Application> {
        let record = self.record(token)?;
        let guard = record.lock().await;
        Ok(guard.application.clone())
    }

    async fn create_chat(&self, application_token: &str) -> Result<Chat> {
        let record = self.record(application_token)?;
        let mut guard = record.lock().await;

        let number = SequenceAllocator::next_after(guard.application.last_chat_number)?;
        let chats_count =
            CounterUpdate::increment(CounterField::ChatsCount).apply(guard.application.chats_count)?;

        let now = Utc::now();
        let chat = Chat {
            id: self.next_id(),
            application_id: guard.application.id.clone(),
            number,
            messages_count: 0,
            last_message_number: 0,
            created_at: now,
            updated_at: now,
        };

        guard.application.last_chat_number = number;
        guard.application.chats_count = chats_count;
        guard.application.updated_at = now;
        guard.chats.insert(
            number,
            Arc::new(Mutex::new(ChatRecord {
                chat: chat.clone(),
                messages: BTreeMap::new(),
                deleted: false,
            })),
        );

        Ok(chat)
    }

    async fn find_chat(&self, application_token: &str, number: i64) -> Result<Chat> {
        let chat = self.chat(application_token, number).await?;
        let guard = chat.lock().await;
        if guard.deleted {
            return Err(chat_not_found(application_token, number));
        }
        Ok(guard.chat.clone())
    }

    async fn count_chats(&self, application_token: &str) -> Result<u64> {
        let record = self.record(application_token)?;
        let guard = record.lock().await;
        Ok(guard.chats.len() as u64)
    }

    async fn list_chats(&self, application_token: &str, offset: u64, limit: u64) -> Result<Vec<Chat>> {
        let page = {
            let record = self.record(application_token)?;
            let guard = record.lock().await;
            window(guard.chats.values().cloned(), offset, limit)
        };

        let mut chats = Vec::with_capacity(page.len());
        for entry in page {
            let guard = entry.lock().await;
            if !guard.deleted {
                chats.push(guard.chat.clone());
            }
        }
        Ok(chats)
    }

    async fn delete_chat(&self, application_token: &str, number: i64) -> Result<()> {
        let removed = {
            let record = self.record(application_token)?;
            let mut guard = record.lock().await;

            if !guard.chats.contains_key(&number) {
                return Err(chat_not_found(application_token, number));
            }
            let chats_count = CounterUpdate::decrement(CounterField::ChatsCount)
                .apply(guard.application.chats_count)?;

            guard.application.chats_count = chats_count;
            guard.application.updated_at = Utc::now();
            guard.chats.remove(&number)
        };

        if let Some(removed) = removed {
            let mut chat = removed.lock().await;
            chat.deleted = true;
            tracing::debug!(
                application_token,
                chat_number = number,
                messages = chat.messages.len(),
                "Deleted chat"
            );
            chat.messages.clear();
        }
        Ok(())
    }

    async fn create_message(
        &self,
        application_token: &str,
        chat_number: i64,
        input: NewMessage,
    ) -> Result<Message> {
        let body = input.validate()?.to_string();
        let chat = self.chat(application_token, chat_number).await?;
        let mut entry = chat.lock().await;
        if entry.deleted {
            return Err(chat_not_found(application_token, chat_number));
        }
        let id = self.next_id();

        let number = SequenceAllocator::next_after(entry.chat.last_message_number)?;
        let messages_count =
            CounterUpdate::increment(CounterField::MessagesCount).apply(entry.chat.messages_count)?;

        let now = Utc::now();
        let message = Message {
            id,
            chat_id: entry.chat.id.clone(),
            number,
            body,
            created_at: now,
            updated_at: now,
        };

        entry.chat.last_message_number = number;
        entry.chat.messages_count = messages_count;
        entry.chat.updated_at = now;
        entry.messages.insert(number, message.clone());

        Ok(message)
    }

    async fn count_messages(&self, application_token: &str, chat_number: i64) -> Result<u64> {
        let chat = self.chat(application_token, chat_number).await?;
        let guard = chat.lock().await;
        if guard.deleted {
            return Err(chat_not_found(application_token, chat_number));
        }
        Ok(guard.messages.len() as u64)
    }

    async fn list_messages(
        &self,
        application_token: &str,
        chat_number: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let chat = self.chat(application_token, chat_number).await?;
        let guard = chat.lock().await;
        if guard.deleted {
            return Err(chat_not_found(application_token, chat_number));
        }
        Ok(window(guard.messages.values().cloned(), offset, limit))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_numbers_start_at_one() {
        let store = MemoryPersistenceClient::new();
        let app = store.create_application(NewApplication::new("support")).await.unwrap();

        let first = store.create_chat(&app.token).await.unwrap();
        let second = store.create_chat(&app.token).await.unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(store.find_application(&app.token).await.unwrap().chats_count, 2);
    }

    #[tokio::test]
    async fn test_numbers_are_scoped_per_parent() {
        let store = MemoryPersistenceClient::new();
        let a = store.create_application(NewApplication::new("a")).await.unwrap();
        let b = store.create_application(NewApplication::new("b")).await.unwrap();

        store.create_chat(&a.token).await.unwrap();
        store.create_chat(&a.token).await.unwrap();
        let chat = store.create_chat(&b.token).await.unwrap();
        assert_eq!(chat.number, 1);
    }

    #[tokio::test]
    async fn test_list_applications_newest_first() {
        let store = MemoryPersistenceClient::new();
        for name in ["one", "two", "three"] {
            store.create_application(NewApplication::new(name)).await.unwrap();
        }

        let names: Vec<_> = store
            .list_applications(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn test_window_past_end_is_empty() {
        let store = MemoryPersistenceClient::new();
        let app = store.create_application(NewApplication::new("x")).await.unwrap();
        store.create_chat(&app.token).await.unwrap();

        assert!(store.list_chats(&app.token, 20, 20).await.unwrap().is_empty());
        assert!(store.list_chats(&app.token, u64::MAX, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_lock_is_per_chat() {
        let store = MemoryPersistenceClient::new();
        let app = store.create_application(NewApplication::new("x")).await.unwrap();
        store.create_chat(&app.token).await.unwrap();
        store.create_chat(&app.token).await.unwrap();

        let busy = store.chat(&app.token, 1).await.unwrap();
        let _held = busy.lock().await;

        // Chat 1 is locked; chat 2 and the application stay available
        let message = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.create_message(&app.token, 2, NewMessage::new("hi")),
        )
        .await
        .expect("chat 2 must not wait on chat 1")
        .unwrap();
        assert_eq!(message.number, 1);

        let next = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.create_chat(&app.token),
        )
        .await
        .expect("chat creation must not wait on chat 1")
        .unwrap();
        assert_eq!(next.number, 3);
    }

    #[tokio::test]
    async fn test_message_on_missing_chat() {
        let store = MemoryPersistenceClient::new();
        let app = store.create_application(NewApplication::new("x")).await.unwrap();

        let err = store
            .create_message(&app.token, 9, NewMessage::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::ChatNotFound { number: 9, .. }));
    }
}
