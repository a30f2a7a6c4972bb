use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::{IndexOptions, ReturnDocument},
    ClientSession, Collection, Database, IndexModel,
};
use futures::TryStreamExt;

use crate::counter::CounterUpdate;
use crate::dbs::mongo::models::MongoApplication;
use crate::dbs::mongo::repositories::{cursor_limit, cursor_skip};
use crate::error::Result;

#[derive(Clone)]
pub struct MongoApplicationRepository {
    collection: Collection<MongoApplication>,
}

impl MongoApplicationRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("applications");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let token = IndexModel::builder()
            .keys(doc! { "token": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let listing = IndexModel::builder()
            .keys(doc! { "created_at": -1, "_id": -1 })
            .build();

        self.collection.create_index(token).await?;
        self.collection.create_index(listing).await?;
        Ok(())
    }

    pub async fn insert(&self, application: &MongoApplication) -> Result<()> {
        self.collection.insert_one(application).await?;
        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<MongoApplication>> {
        Ok(self.collection.find_one(doc! { "token": token }).await?)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    /// Newest first, `_id` breaking ties between equal timestamps
    pub async fn list(&self, offset: u64, limit: u64) -> Result<Vec<MongoApplication>> {
        let applications = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(cursor_skip(offset))
            .limit(cursor_limit(limit))
            .await?
            .try_collect()
            .await?;
        Ok(applications)
    }

    /// Bump the chat sequence and count together, returning the row as it
    /// was before the bump
    pub async fn bump_chat_sequence(
        &self,
        session: &mut ClientSession,
        token: &str,
        counter: CounterUpdate,
    ) -> Result<Option<MongoApplication>> {
        let mut inc = counter.to_inc_doc();
        inc.insert("last_chat_number", 1_i64);

        let update = doc! {
            "$inc": inc,
            "$set": { "updated_at": BsonDateTime::now() }
        };

        let before = self
            .collection
            .find_one_and_update(doc! { "token": token }, update)
            .return_document(ReturnDocument::Before)
            .session(&mut *session)
            .await?;
        Ok(before)
    }

    pub async fn adjust_counter(
        &self,
        session: &mut ClientSession,
        application_id: ObjectId,
        counter: CounterUpdate,
    ) -> Result<()> {
        let update = doc! {
            "$inc": counter.to_inc_doc(),
            "$set": { "updated_at": BsonDateTime::now() }
        };
        self.collection
            .update_one(doc! { "_id": application_id }, update)
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
