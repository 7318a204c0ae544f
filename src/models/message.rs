// File: models/message.rs

use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message as stored in the `messages` collection.
///
/// Exactly one of `receiver_id` / `group_id` is set: a message is either
/// private or addressed to a group chat, never both. The record is written
/// before any live delivery is attempted, so a client that missed the push
/// can always recover the message from history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub group_id: Option<String>,
    pub content: String,
    pub sent_at: BsonDateTime,
}

impl MessageRecord {
    pub fn private(sender_id: &str, receiver_id: &str, content: &str, sent_at: BsonDateTime) -> Self {
        MessageRecord {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: Some(receiver_id.to_string()),
            group_id: None,
            content: content.to_string(),
            sent_at,
        }
    }

    pub fn group(sender_id: &str, group_id: &str, content: &str, sent_at: BsonDateTime) -> Self {
        MessageRecord {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: None,
            group_id: Some(group_id.to_string()),
            content: content.to_string(),
            sent_at,
        }
    }
}
