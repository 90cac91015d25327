//! Outbound chat writes: sending and soft-deleting messages.

use chrono::Utc;
use tracing::{error, info, warn};

use wapi_shared::{Message, MessageId, MessagePatch, NewMessage, NewNotification};
use wapi_store::DocumentStore;

use super::peer::PeerDirectory;
use super::{read_view, write_view, ChatScreen};
use crate::alerts::AlertRequest;
use crate::error::ChatError;
use crate::events::{emit_event, UiEvent};

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub const DELETE_PROMPT: &str = "Delete this message?";

/// The text to send for `input`, or `None` when there is nothing to send.
pub fn outgoing_text(input: &str) -> Option<&str> {
    let text = input.trim();
    (!text.is_empty()).then_some(text)
}

impl<S: DocumentStore, P: PeerDirectory> ChatScreen<S, P> {
    /// Send the current input to the peer.
    ///
    /// Blank input, or a screen without both participants, is a no-op that
    /// leaves the input alone. Otherwise the input is cleared once the write
    /// has been attempted, whether or not it succeeded. The peer
    /// notification is best effort and never fails the send.
    pub async fn send(&self) -> Result<Option<Message>, ChatError> {
        let input = read_view(&self.view).input.clone();
        let (Some(text), Some(key), Some(me), Some(peer)) = (
            outgoing_text(&input),
            self.conversation(),
            self.me.clone(),
            self.peer.clone(),
        ) else {
            return Ok(None);
        };

        let result = self
            .store
            .add_message(&key, NewMessage::outgoing(me.clone(), peer.clone(), text))
            .await;
        write_view(&self.view).input.clear();

        let message = match result {
            Ok(message) => message,
            Err(e) => {
                error!(conversation = %key, error = %e, "Failed to send message");
                return Err(e.into());
            }
        };
        info!(conversation = %key, msg_id = %message.id, "Message sent");

        if let Err(e) = self
            .store
            .add_notification(NewNotification::message_sent(peer, &me))
            .await
        {
            warn!(conversation = %key, error = %e, "Failed to notify peer of new message");
        }
        Ok(Some(message))
    }

    /// Replace the input and send it.
    pub async fn send_text(&self, text: &str) -> Result<Option<Message>, ChatError> {
        self.set_input(text);
        self.send().await
    }

    /// Soft-delete one of the user's own messages after confirmation.
    ///
    /// Returns `Ok(false)` when the user cancels. The local feed is left
    /// untouched; the subscription delivers the placeholder once the store
    /// accepted the edit. A rejected write raises an error alert.
    pub async fn request_delete(
        &self,
        id: MessageId,
        confirm: &impl Confirm,
    ) -> Result<bool, ChatError> {
        let Some(key) = self.conversation() else {
            return Err(ChatError::UnknownMessage);
        };
        let Some(me) = self.me.clone() else {
            return Err(ChatError::NotDeletable);
        };

        let message = read_view(&self.view)
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(ChatError::UnknownMessage)?;
        if !message.can_be_deleted_by(&me) {
            return Err(ChatError::NotDeletable);
        }
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }

        let patch = MessagePatch::SoftDelete { at: Utc::now() };
        if let Err(e) = self.store.update_message(&key, id, patch).await {
            error!(conversation = %key, msg_id = %id, error = %e, "Failed to delete message");
            emit_event(
                &self.events,
                UiEvent::Alert(AlertRequest::error("Failed to delete message")),
            );
            return Err(e.into());
        }
        info!(conversation = %key, msg_id = %id, "Message deleted");

        let other = message.counterpart_of(&me).clone();
        if let Err(e) = self
            .store
            .add_notification(NewNotification::message_deleted(other, &me))
            .await
        {
            warn!(conversation = %key, error = %e, "Failed to notify peer of deletion");
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use wapi_store::ChangeKind;

    use super::*;
    use crate::alerts::AlertLevel;
    use crate::chat::tests::{
        drain_alerts, message, next_feed, screen, snapshot, uid, ScriptedStore,
    };

    #[test]
    fn outgoing_text_is_trimmed() {
        assert_eq!(outgoing_text("  hello  "), Some("hello"));
        assert_eq!(outgoing_text(" \t\n "), None);
        assert_eq!(outgoing_text(""), None);
    }

    #[tokio::test]
    async fn send_stores_trimmed_message_and_notifies_peer() {
        let (store, _feed) = ScriptedStore::new();
        let (screen, _rx) = screen(store.clone(), Some("Baraka"));

        let sent = screen.send_text("  hello  ").await.unwrap().unwrap();
        assert_eq!(sent.content, "hello");
        assert!(sent.delivered && !sent.seen && !sent.deleted);
        assert_eq!(screen.input(), "");

        let added = store.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].sender, uid("1"));
        assert_eq!(added[0].receiver, uid("2"));

        let notes = store.notifications.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].user_id, uid("2"));
        assert_eq!(notes[0].link.as_deref(), Some("/chat/1"));
    }

    #[tokio::test]
    async fn whitespace_send_is_a_no_op() {
        let (store, _feed) = ScriptedStore::new();
        let (screen, _rx) = screen(store.clone(), Some("Baraka"));

        assert!(screen.send_text("   ").await.unwrap().is_none());
        assert!(store.added.lock().unwrap().is_empty());
        assert!(store.notifications.lock().unwrap().is_empty());
        assert_eq!(screen.input(), "   ");
    }

    #[tokio::test]
    async fn failed_send_still_clears_input() {
        let (store, _feed) = ScriptedStore::new();
        store.fail_messages.store(true, Ordering::SeqCst);
        let (screen, _rx) = screen(store.clone(), Some("Baraka"));

        assert!(screen.send_text("hello").await.is_err());
        assert_eq!(screen.input(), "");
        assert!(store.notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_send() {
        let (store, _feed) = ScriptedStore::new();
        store.fail_notifications.store(true, Ordering::SeqCst);
        let (screen, _rx) = screen(store.clone(), Some("Baraka"));

        assert!(screen.send_text("hello").await.unwrap().is_some());
        assert_eq!(store.added.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_sender_may_delete() {
        let (store, feed) = ScriptedStore::new();
        let (mut screen, mut rx) = screen(store.clone(), Some("Baraka"));
        screen.mount().await.unwrap();

        let theirs = message("2", "1", "theirs");
        feed.send(snapshot(ChangeKind::Added, &[&theirs], &[&theirs]))
            .unwrap();
        next_feed(&mut rx).await;

        let err = screen
            .request_delete(theirs.id, &|_: &str| true)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotDeletable));

        let err = screen
            .request_delete(MessageId::new(), &|_: &str| true)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::UnknownMessage));
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let (store, feed) = ScriptedStore::new();
        let (mut screen, mut rx) = screen(store.clone(), Some("Baraka"));
        screen.mount().await.unwrap();

        let mine = message("1", "2", "mine");
        feed.send(snapshot(ChangeKind::Added, &[&mine], &[&mine])).unwrap();
        next_feed(&mut rx).await;

        assert!(!screen.request_delete(mine.id, &|_: &str| false).await.unwrap());
        assert!(store.patches.lock().unwrap().is_empty());

        assert!(screen
            .request_delete(mine.id, &|prompt: &str| prompt == DELETE_PROMPT)
            .await
            .unwrap());
        let patches = store.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        assert!(matches!(patches[0], (id, MessagePatch::SoftDelete { .. }) if id == mine.id));

        let notes = store.notifications.lock().unwrap();
        assert_eq!(notes[0].user_id, uid("2"));

        // Nothing changes locally until the feed reports the edit.
        assert_eq!(screen.messages()[0].content, "mine");
    }

    #[tokio::test]
    async fn rejected_delete_raises_error_alert() {
        let (store, feed) = ScriptedStore::new();
        store.fail_updates.store(true, Ordering::SeqCst);
        let (mut screen, mut rx) = screen(store.clone(), Some("Baraka"));
        screen.mount().await.unwrap();

        let mine = message("1", "2", "mine");
        feed.send(snapshot(ChangeKind::Added, &[&mine], &[&mine])).unwrap();
        next_feed(&mut rx).await;

        assert!(screen.request_delete(mine.id, &|_: &str| true).await.is_err());
        let alerts = drain_alerts(&mut rx);
        assert!(alerts.iter().any(|a| a.level == AlertLevel::Error));
        assert!(!screen.messages()[0].deleted);
        assert!(store.notifications.lock().unwrap().is_empty());
    }
}
