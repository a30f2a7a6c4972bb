use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::{IndexOptions, ReturnDocument},
    ClientSession, Collection, Database, IndexModel,
};
use futures::TryStreamExt;

use crate::counter::CounterUpdate;
use crate::dbs::mongo::models::MongoChat;
use crate::dbs::mongo::repositories::{cursor_limit, cursor_skip};
use crate::error::Result;

#[derive(Clone)]
pub struct MongoChatRepository {
    collection: Collection<MongoChat>,
}

impl MongoChatRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("chats");
        Self { collection }
    }

    /// A concurrent insert with an already-used number fails on this index
    pub async fn ensure_indexes(&self) -> Result<()> {
        let number = IndexModel::builder()
            .keys(doc! { "application_id": 1, "number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(number).await?;
        Ok(())
    }

    pub async fn insert(&self, session: &mut ClientSession, chat: &MongoChat) -> Result<()> {
        self.collection.insert_one(chat).session(&mut *session).await?;
        Ok(())
    }

    pub async fn find(&self, application_id: ObjectId, number: i64) -> Result<Option<MongoChat>> {
        let filter = doc! { "application_id": application_id, "number": number };
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn count(&self, application_id: ObjectId) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "application_id": application_id })
            .await?)
    }

    pub async fn list(&self, application_id: ObjectId, offset: u64, limit: u64) -> Result<Vec<MongoChat>> {
        let chats = self
            .collection
            .find(doc! { "application_id": application_id })
            .sort(doc! { "number": 1 })
            .skip(cursor_skip(offset))
            .limit(cursor_limit(limit))
            .await?
            .try_collect()
            .await?;
        Ok(chats)
    }

    /// Bump the message sequence and count together, returning the row as
    /// it was before the bump
    pub async fn bump_message_sequence(
        &self,
        session: &mut ClientSession,
        application_id: ObjectId,
        number: i64,
        counter: CounterUpdate,
    ) -> Result<Option<MongoChat>> {
        let mut inc = counter.to_inc_doc();
        inc.insert("last_message_number", 1_i64);

        let update = doc! {
            "$inc": inc,
            "$set": { "updated_at": BsonDateTime::now() }
        };

        let before = self
            .collection
            .find_one_and_update(doc! { "application_id": application_id, "number": number }, update)
            .return_document(ReturnDocument::Before)
            .session(&mut *session)
            .await?;
        Ok(before)
    }

    pub async fn delete(
        &self,
        session: &mut ClientSession,
        application_id: ObjectId,
        number: i64,
    ) -> Result<Option<MongoChat>> {
        let filter = doc! { "application_id": application_id, "number": number };
        Ok(self
            .collection
            .find_one_and_delete(filter)
            .session(&mut *session)
            .await?)
    }
}
