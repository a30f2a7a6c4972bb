use mongodb::{
    bson::{doc, oid::ObjectId},
    options::IndexOptions,
    ClientSession, Collection, Database, IndexModel,
};
use futures::TryStreamExt;

use crate::dbs::mongo::models::MongoMessage;
use crate::dbs::mongo::repositories::{cursor_limit, cursor_skip};
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("messages");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let number = IndexModel::builder()
            .keys(doc! { "chat_id": 1, "number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(number).await?;
        Ok(())
    }

    pub async fn insert(&self, session: &mut ClientSession, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).session(&mut *session).await?;
        Ok(())
    }

    pub async fn count(&self, chat_id: ObjectId) -> Result<u64> {
        Ok(self.collection.count_documents(doc! { "chat_id": chat_id }).await?)
    }

    /// Messages of a chat ascending by number
    pub async fn list(&self, chat_id: ObjectId, offset: u64, limit: u64) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "chat_id": chat_id })
            .sort(doc! { "number": 1 })
            .skip(cursor_skip(offset))
            .limit(cursor_limit(limit))
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn delete_for_chat(&self, session: &mut ClientSession, chat_id: ObjectId) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "chat_id": chat_id })
            .session(&mut *session)
            .await?;
        Ok(result.deleted_count)
    }
}
