//! Chat documents as they live in the real-time document store.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be persisted
//! as-is and handed to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DELETED_PLACEHOLDER;
use crate::types::{MessageId, UserId};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Assigned by the store on creation.
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    /// The feed's ordering key. Assigned by the store on creation and
    /// refreshed to the deletion time on soft-delete.
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
    pub seen: bool,
    pub delivered: bool,
}

impl Message {
    /// An incoming message the local user has not read yet.
    pub fn is_unseen_for(&self, user: &UserId) -> bool {
        &self.receiver == user && !self.seen
    }

    /// Only the sender may delete, and only once.
    pub fn can_be_deleted_by(&self, user: &UserId) -> bool {
        &self.sender == user && !self.deleted
    }

    /// The other participant from `user`'s point of view.
    pub fn counterpart_of(&self, user: &UserId) -> &UserId {
        if &self.sender == user {
            &self.receiver
        } else {
            &self.sender
        }
    }

    /// Apply a field-level patch. Patches are idempotent and monotonic:
    /// `seen` and `deleted` never revert, and a deleted message keeps the
    /// placeholder content.
    ///
    /// Soft-delete moves `timestamp` to the deletion time, so the message
    /// re-sorts to "now" in the feed. Deleting twice keeps the first time.
    pub fn apply(&mut self, patch: &MessagePatch) {
        match patch {
            MessagePatch::MarkSeen => self.seen = true,
            MessagePatch::SoftDelete { .. } if self.deleted => {}
            MessagePatch::SoftDelete { at } => {
                self.content = DELETED_PLACEHOLDER.to_string();
                self.deleted = true;
                self.timestamp = *at;
            }
        }
    }
}

/// Fields supplied by the composer; the store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    pub delivered: bool,
    pub seen: bool,
    pub deleted: bool,
}

impl NewMessage {
    pub fn outgoing(sender: UserId, receiver: UserId, content: impl Into<String>) -> Self {
        Self {
            sender,
            receiver,
            content: content.into(),
            delivered: true,
            seen: false,
            deleted: false,
        }
    }

    pub fn into_message(self, id: MessageId, timestamp: DateTime<Utc>) -> Message {
        Message {
            id,
            sender: self.sender,
            receiver: self.receiver,
            content: self.content,
            timestamp,
            deleted: self.deleted,
            seen: self.seen,
            delivered: self.delivered,
        }
    }
}

/// In-place mutations a message document accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MessagePatch {
    MarkSeen,
    SoftDelete { at: DateTime<Utc> },
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Outbound signal picked up by the recipient's notifications view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub text: String,
    pub link: Option<String>,
}

impl NewNotification {
    /// Tell `to` that `from` sent a message.
    pub fn message_sent(to: UserId, from: &UserId) -> Self {
        Self {
            user_id: to,
            text: format!("You have a new message from user {from}"),
            link: Some(format!("/chat/{from}")),
        }
    }

    /// Tell `to` that `from` deleted a message in their chat.
    pub fn message_deleted(to: UserId, from: &UserId) -> Self {
        Self {
            user_id: to,
            text: format!("User {from} deleted a message in your chat"),
            link: Some(format!("/chat/{from}")),
        }
    }

    pub fn into_notification(self, id: Uuid, timestamp: DateTime<Utc>) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            text: self.text,
            timestamp,
            read: false,
            link: self.link,
        }
    }
}
