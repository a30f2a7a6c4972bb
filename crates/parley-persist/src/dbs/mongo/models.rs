use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::{Application, Chat, Message};

/// MongoDB-specific Application model (uses ObjectId)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoApplication {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub token: String,
    pub name: String,
    pub chats_count: i64,
    pub last_chat_number: i64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// MongoDB-specific Chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChat {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub application_id: ObjectId,
    pub number: i64,
    pub messages_count: i64,
    pub last_message_number: i64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// MongoDB-specific Message model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub chat_id: ObjectId,
    pub number: i64,
    pub body: String,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

pub(crate) fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

pub(crate) fn from_bson_datetime(at: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

// Conversions from MongoDB-specific to database-agnostic models

impl From<MongoApplication> for Application {
    fn from(app: MongoApplication) -> Self {
        Self {
            id: app.id.to_hex(),
            token: app.token,
            name: app.name,
            chats_count: app.chats_count,
            last_chat_number: app.last_chat_number,
            created_at: from_bson_datetime(app.created_at),
            updated_at: from_bson_datetime(app.updated_at),
        }
    }
}

impl From<MongoChat> for Chat {
    fn from(chat: MongoChat) -> Self {
        Self {
            id: chat.id.to_hex(),
            application_id: chat.application_id.to_hex(),
            number: chat.number,
            messages_count: chat.messages_count,
            last_message_number: chat.last_message_number,
            created_at: from_bson_datetime(chat.created_at),
            updated_at: from_bson_datetime(chat.updated_at),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id.to_hex(),
            chat_id: msg.chat_id.to_hex(),
            number: msg.number,
            body: msg.body,
            created_at: from_bson_datetime(msg.created_at),
            updated_at: from_bson_datetime(msg.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_round_trip_keeps_millis() {
        let now = Utc::now();
        let back = from_bson_datetime(to_bson_datetime(now));
        assert_eq!(back.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_application_conversion() {
        let id = ObjectId::new();
        let now = BsonDateTime::now();
        let app: Application = MongoApplication {
            id,
            token: "abc".into(),
            name: "support".into(),
            chats_count: 2,
            last_chat_number: 3,
            created_at: now,
            updated_at: now,
        }
        .into();

        assert_eq!(app.id, id.to_hex());
        assert_eq!(app.chats_count, 2);
        assert_eq!(app.last_chat_number, 3);
    }
}
