// File: message_hub.rs

use std::sync::Arc;

use actix::prelude::*;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::db::MongoDB;
use crate::models::{Employee, GroupChat, MessageRecord};
use crate::registry::SessionRegistry;

/// Failures a send operation reports back to the submitting session. Only
/// the inability to persist the message is an error; delivery to individual
/// connections is best-effort and never fails the send.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("storage error: {0}")]
    Storage(#[from] mongodb::error::Error),
}

/// Push events delivered to websocket sessions, sent over the wire as
/// internally tagged JSON (`"type"` of `private_message`, `group_message`
/// or `send_rejected`).
#[derive(Message, Debug, Clone, PartialEq, Serialize)]
#[rtype(result = "()")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PrivateMessage {
        message_id: String,
        sender_id: String,
        sender_name: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
    GroupMessage {
        message_id: String,
        sender_id: String,
        sender_name: String,
        group_id: String,
        group_name: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
    SendRejected {
        reason: String,
    },
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<SessionEvent>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub user_id: String,
    pub addr: Recipient<SessionEvent>,
}

#[derive(Message)]
#[rtype(result = "Result<(), HubError>")]
pub struct SendPrivateMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

#[derive(Message)]
#[rtype(result = "Result<(), HubError>")]
pub struct SendGroupMessage {
    pub sender_id: String,
    pub group_id: String,
    pub content: String,
    /// The connection the send arrived on; it is skipped during fan-out
    /// while the sender's other sessions still receive the event.
    pub exclude: Option<Recipient<SessionEvent>>,
}

/// Central router actor. Owns the session registry and fans persisted
/// messages out to every connection that should see them.
pub struct MessageHub {
    registry: SessionRegistry,
    db: Arc<MongoDB>,
}

impl MessageHub {
    pub fn new(db: Arc<MongoDB>) -> Self {
        MessageHub {
            registry: SessionRegistry::new(),
            db,
        }
    }
}

impl Actor for MessageHub {
    type Context = Context<Self>;
}

impl Handler<Connect> for MessageHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        let open = self.registry.register(&msg.user_id, msg.addr);
        info!("User {} connected ({} open sessions)", msg.user_id, open);
    }
}

impl Handler<Disconnect> for MessageHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        let open = self.registry.unregister(&msg.user_id, &msg.addr);
        info!("User {} disconnected ({} open sessions)", msg.user_id, open);
    }
}

impl Handler<SendPrivateMessage> for MessageHub {
    type Result = ResponseFuture<Result<(), HubError>>;

    fn handle(&mut self, msg: SendPrivateMessage, _: &mut Context<Self>) -> Self::Result {
        let db = self.db.clone();
        // Snapshot before suspending; the live table stays with the actor.
        let snapshot = self.registry.snapshot();

        Box::pin(async move {
            let sent_at = Utc::now();
            let record = MessageRecord::private(
                &msg.sender_id,
                &msg.receiver_id,
                &msg.content,
                BsonDateTime::from_millis(sent_at.timestamp_millis()),
            );
            db.db
                .collection::<MessageRecord>("messages")
                .insert_one(&record)
                .await?;

            let event = SessionEvent::PrivateMessage {
                message_id: record.id.clone(),
                sender_id: msg.sender_id.clone(),
                sender_name: display_name(&db, &msg.sender_id).await,
                content: msg.content,
                sent_at,
            };
            // The receiver's sessions plus the sender's own other devices.
            let pushed = snapshot.push_to(
                [msg.receiver_id.as_str(), msg.sender_id.as_str()],
                &event,
                None,
            );
            debug!("Message {} pushed to {} sessions", record.id, pushed);
            Ok(())
        })
    }
}

impl Handler<SendGroupMessage> for MessageHub {
    type Result = ResponseFuture<Result<(), HubError>>;

    fn handle(&mut self, msg: SendGroupMessage, _: &mut Context<Self>) -> Self::Result {
        let db = self.db.clone();
        let snapshot = self.registry.snapshot();

        Box::pin(async move {
            let sent_at = Utc::now();
            let record = MessageRecord::group(
                &msg.sender_id,
                &msg.group_id,
                &msg.content,
                BsonDateTime::from_millis(sent_at.timestamp_millis()),
            );
            db.db
                .collection::<MessageRecord>("messages")
                .insert_one(&record)
                .await?;

            // Membership is resolved fresh on every send, never cached.
            let group = match db
                .db
                .collection::<GroupChat>("group_chats")
                .find_one(doc! { "_id": &msg.group_id })
                .await
            {
                Ok(Some(group)) => group,
                Ok(None) => {
                    debug!(
                        "Group {} gone before fan-out; message {} stored only",
                        msg.group_id, record.id
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Membership lookup for group {} failed: {}; message {} stored, delivery skipped",
                        msg.group_id, e, record.id
                    );
                    return Ok(());
                }
            };

            let event = SessionEvent::GroupMessage {
                message_id: record.id.clone(),
                sender_id: msg.sender_id.clone(),
                sender_name: display_name(&db, &msg.sender_id).await,
                group_id: group.id.clone(),
                group_name: group.name,
                content: msg.content,
                sent_at,
            };
            let pushed = snapshot.push_to(
                group.member_ids.iter().map(String::as_str),
                &event,
                msg.exclude.as_ref(),
            );
            debug!(
                "Message {} pushed to {} sessions of group {}",
                record.id, pushed, group.id
            );
            Ok(())
        })
    }
}

/// Looks up the sender's display name for the push payload. A missing or
/// unreadable employee record falls back to the raw id; the send itself
/// already succeeded at this point.
async fn display_name(db: &MongoDB, user_id: &str) -> String {
    match db
        .db
        .collection::<Employee>("employees")
        .find_one(doc! { "_id": user_id })
        .await
    {
        Ok(Some(employee)) => employee.full_name,
        Ok(None) => {
            warn!("No employee record for sender {}; using id as name", user_id);
            user_id.to_string()
        }
        Err(e) => {
            warn!("Employee lookup for {} failed: {}; using id as name", user_id, e);
            user_id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{offline_db, recorder, Flush};
    use chrono::TimeZone;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap()
    }

    #[actix_rt::test]
    async fn failed_private_persistence_issues_no_pushes() {
        let hub = MessageHub::new(offline_db().await).start();

        let (receiver, receiver_events) = recorder();
        hub.send(Connect {
            user_id: "u-2".to_string(),
            addr: receiver.clone().recipient(),
        })
        .await
        .unwrap();

        let result = hub
            .send(SendPrivateMessage {
                sender_id: "u-1".to_string(),
                receiver_id: "u-2".to_string(),
                content: "hello".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(result, Err(HubError::Storage(_))));

        receiver.send(Flush).await.unwrap();
        assert!(receiver_events.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn failed_group_persistence_issues_no_pushes() {
        let hub = MessageHub::new(offline_db().await).start();

        let (member, member_events) = recorder();
        hub.send(Connect {
            user_id: "u-3".to_string(),
            addr: member.clone().recipient(),
        })
        .await
        .unwrap();

        let result = hub
            .send(SendGroupMessage {
                sender_id: "u-1".to_string(),
                group_id: "g-7".to_string(),
                content: "hello".to_string(),
                exclude: None,
            })
            .await
            .unwrap();
        assert!(matches!(result, Err(HubError::Storage(_))));

        member.send(Flush).await.unwrap();
        assert!(member_events.lock().unwrap().is_empty());
    }

    #[test]
    fn private_event_is_tagged_and_flat() {
        let event = SessionEvent::PrivateMessage {
            message_id: "m-1".to_string(),
            sender_id: "u-1".to_string(),
            sender_name: "Dana".to_string(),
            content: "hello".to_string(),
            sent_at: fixed_instant(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "private_message");
        assert_eq!(value["message_id"], "m-1");
        assert_eq!(value["sender_id"], "u-1");
        assert_eq!(value["sender_name"], "Dana");
        assert_eq!(value["content"], "hello");
        assert!(value["sent_at"].is_string());
    }

    #[test]
    fn group_event_carries_group_identity() {
        let event = SessionEvent::GroupMessage {
            message_id: "m-2".to_string(),
            sender_id: "u-1".to_string(),
            sender_name: "Dana".to_string(),
            group_id: "g-7".to_string(),
            group_name: "Payroll".to_string(),
            content: "ship it".to_string(),
            sent_at: fixed_instant(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "group_message");
        assert_eq!(value["group_id"], "g-7");
        assert_eq!(value["group_name"], "Payroll");
    }

    #[test]
    fn rejection_event_names_its_reason() {
        let event = SessionEvent::SendRejected {
            reason: "connection is not authenticated".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "send_rejected");
        assert_eq!(value["reason"], "connection is not authenticated");
    }
}
