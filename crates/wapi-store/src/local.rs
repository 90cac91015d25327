//! SQLite-backed [`DocumentStore`] with an in-process change feed.
//!
//! Every successful write to a conversation re-reads the ordered collection
//! and pushes it to all live subscribers of that conversation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use wapi_shared::{
    ConversationKey, Message, MessageId, MessagePatch, NewMessage, NewNotification, Notification,
    UserId,
};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::feed::{ChangeKind, DocumentChange, DocumentStore, FeedSnapshot, Subscription};

type Subscribers = HashMap<ConversationKey, HashMap<u64, mpsc::UnboundedSender<FeedSnapshot>>>;

#[derive(Clone)]
pub struct LocalDocumentStore {
    db: Arc<Mutex<Database>>,
    subscribers: Arc<Mutex<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl LocalDocumentStore {
    pub fn new(db: Database) -> Self {
        Self::with_shared(Arc::new(Mutex::new(db)))
    }

    /// Share a database handle that other components (e.g. the session)
    /// also use.
    pub fn with_shared(db: Arc<Mutex<Database>>) -> Self {
        Self {
            db,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }

    /// Live subscriptions on a conversation.
    pub fn subscriber_count(&self, key: &ConversationKey) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.get(key).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Notifications addressed to `user`, newest first.
    pub fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>> {
        self.lock_db()?.list_notifications(user)
    }

    /// Mark every notification addressed to `user` as read.
    pub fn mark_notifications_read(&self, user: &UserId) -> Result<usize> {
        self.lock_db()?.mark_notifications_read(user)
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn publish(&self, key: &ConversationKey, kind: ChangeKind, message: Message) -> Result<()> {
        // Read and send under the subscriber lock so concurrent writers can
        // never deliver an older snapshot after a newer one.
        let mut subs = self.subscribers.lock().map_err(|_| StoreError::LockPoisoned)?;
        let Some(conversation) = subs.get_mut(key) else {
            return Ok(());
        };

        let messages = self.lock_db()?.list_messages(key)?;
        let snapshot = FeedSnapshot {
            messages,
            changes: vec![DocumentChange { kind, message }],
        };

        conversation.retain(|_, tx| tx.send(snapshot.clone()).is_ok());
        debug!(path = %key.messages_path(), subscribers = conversation.len(), "published snapshot");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn subscribe(&self, key: &ConversationKey) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Register and take the initial snapshot under the subscriber lock so
        // no write can slip in between the two.
        {
            let mut subs = self.subscribers.lock().map_err(|_| StoreError::LockPoisoned)?;
            let messages = self.lock_db()?.list_messages(key)?;
            let changes = messages
                .iter()
                .cloned()
                .map(|message| DocumentChange {
                    kind: ChangeKind::Added,
                    message,
                })
                .collect();
            // The receiver is still in scope, so this send cannot fail.
            let _ = tx.send(FeedSnapshot { messages, changes });
            subs.entry(key.clone()).or_default().insert(id, tx);
        }

        info!(path = %key.messages_path(), subscription = id, "feed subscribed");

        let subscribers = self.subscribers.clone();
        let key = key.clone();
        Ok(Subscription::new(rx, move || {
            if let Ok(mut subs) = subscribers.lock() {
                if let Some(conversation) = subs.get_mut(&key) {
                    conversation.remove(&id);
                    if conversation.is_empty() {
                        subs.remove(&key);
                    }
                }
            }
            debug!(path = %key.messages_path(), subscription = id, "feed unsubscribed");
        }))
    }

    async fn add_message(&self, key: &ConversationKey, message: NewMessage) -> Result<Message> {
        if !key.includes(&message.sender) || !key.includes(&message.receiver) {
            return Err(StoreError::Rejected(format!(
                "{} -> {} does not belong in {}",
                message.sender,
                message.receiver,
                key.messages_path()
            )));
        }
        let stored = self.lock_db()?.insert_message(key, message)?;
        self.publish(key, ChangeKind::Added, stored.clone())?;
        Ok(stored)
    }

    async fn update_message(
        &self,
        key: &ConversationKey,
        id: MessageId,
        patch: MessagePatch,
    ) -> Result<Message> {
        let updated = self.lock_db()?.update_message(key, id, &patch)?;
        self.publish(key, ChangeKind::Modified, updated.clone())?;
        Ok(updated)
    }

    async fn get_message(&self, key: &ConversationKey, id: MessageId) -> Result<Message> {
        self.lock_db()?.get_message(key, id)
    }

    async fn add_notification(&self, notification: NewNotification) -> Result<Notification> {
        self.lock_db()?.insert_notification(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn store() -> LocalDocumentStore {
        LocalDocumentStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn initial_snapshot_reports_existing_as_added() {
        let store = store();
        let key = ConversationKey::between(&uid("1"), &uid("2"));
        store
            .add_message(&key, NewMessage::outgoing(uid("1"), uid("2"), "a"))
            .await
            .unwrap();
        store
            .add_message(&key, NewMessage::outgoing(uid("2"), uid("1"), "b"))
            .await
            .unwrap();

        let mut sub = store.subscribe(&key).await.unwrap();
        let first = sub.next().await.unwrap();
        assert_eq!(first.messages.len(), 2);
        assert_eq!(first.added().count(), 2);
    }

    #[tokio::test]
    async fn writes_push_full_snapshots() {
        let store = store();
        let key = ConversationKey::between(&uid("1"), &uid("2"));
        let mut sub = store.subscribe(&key).await.unwrap();
        assert!(sub.next().await.unwrap().messages.is_empty());

        let m = store
            .add_message(&key, NewMessage::outgoing(uid("1"), uid("2"), "hi"))
            .await
            .unwrap();
        let added = sub.next().await.unwrap();
        assert_eq!(added.messages, vec![m.clone()]);
        assert_eq!(added.changes[0].kind, ChangeKind::Added);

        store
            .update_message(&key, m.id, MessagePatch::SoftDelete { at: Utc::now() })
            .await
            .unwrap();
        let modified = sub.next().await.unwrap();
        assert_eq!(modified.messages.len(), 1);
        assert!(modified.messages[0].deleted);
        assert_eq!(modified.changes[0].kind, ChangeKind::Modified);
        assert_eq!(modified.added().count(), 0);
    }

    #[tokio::test]
    async fn other_conversations_do_not_notify() {
        let store = store();
        let key = ConversationKey::between(&uid("1"), &uid("2"));
        let other = ConversationKey::between(&uid("1"), &uid("3"));
        let mut sub = store.subscribe(&key).await.unwrap();
        sub.next().await.unwrap();

        store
            .add_message(&other, NewMessage::outgoing(uid("1"), uid("3"), "x"))
            .await
            .unwrap();
        store
            .add_message(&key, NewMessage::outgoing(uid("1"), uid("2"), "y"))
            .await
            .unwrap();

        let next = sub.next().await.unwrap();
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.messages[0].content, "y");
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters() {
        let store = store();
        let key = ConversationKey::between(&uid("1"), &uid("2"));
        let sub = store.subscribe(&key).await.unwrap();
        assert_eq!(store.subscriber_count(&key), 1);
        drop(sub);
        assert_eq!(store.subscriber_count(&key), 0);
    }

    #[tokio::test]
    async fn notifications_are_recorded() {
        let store = store();
        store
            .add_notification(NewNotification::message_sent(uid("2"), &uid("1")))
            .await
            .unwrap();
        assert_eq!(store.notifications_for(&uid("2")).unwrap().len(), 1);

        assert_eq!(store.mark_notifications_read(&uid("2")).unwrap(), 1);
        assert!(store.notifications_for(&uid("2")).unwrap()[0].read);
    }

    #[tokio::test]
    async fn message_outside_conversation_is_rejected() {
        let store = store();
        let key = ConversationKey::between(&uid("1"), &uid("2"));
        let mut sub = store.subscribe(&key).await.unwrap();
        sub.next().await.unwrap();

        let err = store
            .add_message(&key, NewMessage::outgoing(uid("1"), uid("3"), "wrong chat"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(store.lock_db().unwrap().list_messages(&key).unwrap().is_empty());
    }
}
