//! Real-time chat document store abstraction.
//!
//! A backend exposes ordered subscription, document add, field update and
//! point read for a conversation's messages, plus appends to the flat
//! notifications collection. Subscribers receive the *whole* ordered
//! collection on every change together with the list of documents that
//! changed in that batch; they never patch local state incrementally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use wapi_shared::{
    ConversationKey, Message, MessageId, MessagePatch, NewMessage, NewNotification, Notification,
};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// First time this subscription sees the document. On the initial
    /// snapshot every existing document is reported as added.
    Added,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub message: Message,
}

/// One change batch: the full ordered collection plus what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// Every message of the conversation, creation timestamp ascending.
    pub messages: Vec<Message>,
    pub changes: Vec<DocumentChange>,
}

impl FeedSnapshot {
    /// Messages reported as newly added in this batch.
    pub fn added(&self) -> impl Iterator<Item = &Message> {
        self.changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Added)
            .map(|c| &c.message)
    }
}

/// A standing subscription to a conversation's ordered messages.
///
/// Dropping the subscription (or calling [`Subscription::cancel`]) detaches
/// it from the backend; no further snapshots are delivered.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<FeedSnapshot>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a snapshot channel. `on_cancel` runs exactly once, on cancel or
    /// drop, and should unregister the sender on the backend side.
    pub fn new(
        rx: mpsc::UnboundedReceiver<FeedSnapshot>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Wait for the next change batch. `None` once the backend hung up or
    /// the subscription was cancelled.
    pub async fn next(&mut self) -> Option<FeedSnapshot> {
        if self.on_cancel.is_none() {
            return None;
        }
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            self.rx.close();
            on_cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.on_cancel.is_some())
            .finish()
    }
}

/// The real-time document store the chat screen talks to.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Open a subscription to `chats/{key}/messages` ordered by timestamp.
    /// The current collection is delivered as the first snapshot.
    async fn subscribe(&self, key: &ConversationKey) -> Result<Subscription>;

    /// Append a message; the store assigns id and timestamp.
    async fn add_message(&self, key: &ConversationKey, message: NewMessage) -> Result<Message>;

    /// Apply a field-level patch to one message.
    async fn update_message(
        &self,
        key: &ConversationKey,
        id: MessageId,
        patch: MessagePatch,
    ) -> Result<Message>;

    async fn get_message(&self, key: &ConversationKey, id: MessageId) -> Result<Message>;

    /// Append to the flat notifications collection.
    async fn add_notification(&self, notification: NewNotification) -> Result<Notification>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn cancel_runs_once_and_stops_delivery() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = cancelled.clone();
        let mut sub = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(FeedSnapshot::default()).unwrap();
        assert!(sub.next().await.is_some());

        sub.cancel();
        sub.cancel();
        drop(sub);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert!(tx.send(FeedSnapshot::default()).is_err());
    }

    #[tokio::test]
    async fn drop_cancels() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = cancelled.clone();
        let sub = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }
}
