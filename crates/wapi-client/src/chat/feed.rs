//! Live feed handling.
//!
//! Each change batch replaces the screen's message list wholesale. Newly
//! added incoming messages additionally trigger a read-receipt flip and,
//! unless already deleted, a transient alert. Both side effects happen at
//! most once per message id for the lifetime of the screen.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use wapi_shared::constants::FALLBACK_PEER_NAME;
use wapi_shared::{ConversationKey, Message, MessageId, MessagePatch, UserId};
use wapi_store::{DocumentStore, FeedSnapshot, Subscription};

use super::{write_view, SharedView};
use crate::alerts::AlertRequest;
use crate::events::{emit_event, EventSender, UiEvent};
use crate::routes::Route;

/// Side effects a change batch calls for.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedActions {
    /// Incoming messages to flip to `seen = true`.
    pub mark_seen: Vec<MessageId>,
    /// Incoming messages to raise an alert for.
    pub alerts: Vec<Message>,
}

/// Decides, batch by batch, which added messages need a seen flip or an
/// alert.
#[derive(Debug)]
pub struct FeedReconciler {
    me: UserId,
    seen_requested: HashSet<MessageId>,
    alerted: HashSet<MessageId>,
}

impl FeedReconciler {
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            seen_requested: HashSet::new(),
            alerted: HashSet::new(),
        }
    }

    pub fn reconcile(&mut self, snapshot: &FeedSnapshot) -> FeedActions {
        let mut actions = FeedActions::default();
        for message in snapshot.added() {
            if !message.is_unseen_for(&self.me) {
                continue;
            }
            if self.seen_requested.insert(message.id) {
                actions.mark_seen.push(message.id);
            }
            if !message.deleted && self.alerted.insert(message.id) {
                actions.alerts.push(message.clone());
            }
        }
        actions
    }
}

/// Drives one subscription until it closes or the owning task is aborted.
pub(crate) struct FeedWorker<S: DocumentStore> {
    pub(crate) store: Arc<S>,
    pub(crate) key: ConversationKey,
    pub(crate) reconciler: FeedReconciler,
    pub(crate) view: SharedView,
    pub(crate) events: EventSender,
}

impl<S: DocumentStore> FeedWorker<S> {
    pub(crate) async fn run(mut self, mut subscription: Subscription) {
        while let Some(snapshot) = subscription.next().await {
            self.apply(snapshot);
        }
        debug!(conversation = %self.key, "Feed closed");
    }

    fn apply(&mut self, snapshot: FeedSnapshot) {
        let actions = self.reconciler.reconcile(&snapshot);

        let peer_name = {
            let mut view = write_view(&self.view);
            view.messages = snapshot.messages.clone();
            view.peer_name
                .clone()
                .unwrap_or_else(|| FALLBACK_PEER_NAME.to_string())
        };

        debug!(
            conversation = %self.key,
            messages = snapshot.messages.len(),
            changes = snapshot.changes.len(),
            "Feed updated"
        );
        emit_event(
            &self.events,
            UiEvent::FeedUpdated {
                conversation: self.key.clone(),
                messages: snapshot.messages,
            },
        );

        for id in actions.mark_seen {
            self.spawn_mark_seen(id);
        }

        for message in actions.alerts {
            emit_event(
                &self.events,
                UiEvent::Alert(AlertRequest::message(
                    peer_name.clone(),
                    message.content,
                    Route::Chat {
                        with: message.sender,
                    },
                )),
            );
        }
    }

    fn spawn_mark_seen(&self, id: MessageId) {
        let store = self.store.clone();
        let key = self.key.clone();
        tokio::spawn(async move {
            if let Err(e) = store.update_message(&key, id, MessagePatch::MarkSeen).await {
                warn!(conversation = %key, msg_id = %id, error = %e, "Failed to mark message seen");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wapi_shared::NewMessage;
    use wapi_store::{ChangeKind, DocumentChange};

    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn incoming(content: &str) -> Message {
        NewMessage::outgoing(uid("2"), uid("1"), content).into_message(MessageId::new(), Utc::now())
    }

    fn batch(kind: ChangeKind, changed: &[Message], all: &[Message]) -> FeedSnapshot {
        FeedSnapshot {
            messages: all.to_vec(),
            changes: changed
                .iter()
                .cloned()
                .map(|message| DocumentChange { kind, message })
                .collect(),
        }
    }

    #[test]
    fn incoming_unseen_message_is_flipped_and_alerted_once() {
        let mut reconciler = FeedReconciler::new(uid("1"));
        let m = incoming("hi");

        let first = reconciler.reconcile(&batch(ChangeKind::Added, &[m.clone()], &[m.clone()]));
        assert_eq!(first.mark_seen, vec![m.id]);
        assert_eq!(first.alerts, vec![m.clone()]);

        // Redelivery of the same document does nothing new.
        let again = reconciler.reconcile(&batch(ChangeKind::Added, &[m.clone()], &[m.clone()]));
        assert_eq!(again, FeedActions::default());
    }

    #[test]
    fn own_and_modified_messages_are_ignored() {
        let mut reconciler = FeedReconciler::new(uid("1"));
        let mine = NewMessage::outgoing(uid("1"), uid("2"), "yo")
            .into_message(MessageId::new(), Utc::now());
        let other = incoming("edited");

        assert_eq!(
            reconciler.reconcile(&batch(ChangeKind::Added, &[mine.clone()], &[mine])),
            FeedActions::default()
        );
        assert_eq!(
            reconciler.reconcile(&batch(ChangeKind::Modified, &[other.clone()], &[other])),
            FeedActions::default()
        );
    }

    #[test]
    fn deleted_incoming_message_is_flipped_without_alert() {
        let mut reconciler = FeedReconciler::new(uid("1"));
        let mut m = incoming("oops");
        m.apply(&MessagePatch::SoftDelete { at: Utc::now() });

        let actions = reconciler.reconcile(&batch(ChangeKind::Added, &[m.clone()], &[m.clone()]));
        assert_eq!(actions.mark_seen, vec![m.id]);
        assert!(actions.alerts.is_empty());
    }

    #[test]
    fn seen_incoming_message_needs_nothing() {
        let mut reconciler = FeedReconciler::new(uid("1"));
        let mut m = incoming("read already");
        m.apply(&MessagePatch::MarkSeen);

        let actions = reconciler.reconcile(&batch(ChangeKind::Added, &[m.clone()], &[m]));
        assert_eq!(actions, FeedActions::default());
    }
}
