// File: models/group_chat.rs

use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// A named group chat and its membership. Joins and leaves happen in the
/// surrounding CRUD app; this service only reads the member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupChat {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub member_ids: Vec<String>,
    pub created_at: BsonDateTime,
}
