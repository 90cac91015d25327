//! Real-time friend chat.
//!
//! A [`ChatScreen`] is mounted for one counterpart. Mounting resolves the
//! peer's display name in the background and opens a standing feed
//! subscription on the conversation; every change batch replaces the local
//! message list. Unmounting cancels the subscription and drops the list.
//!
//! Outbound writes (send, soft-delete) never touch the local list. The feed
//! observes the authoritative result.

pub mod composer;
pub mod feed;
pub mod peer;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use wapi_shared::{ConversationKey, Message, UserId};
use wapi_store::DocumentStore;

use crate::error::ChatError;
use crate::events::{emit_event, EventSender, UiEvent};
use feed::{FeedReconciler, FeedWorker};
use peer::{resolve_peer_name, PeerDirectory};

pub use composer::Confirm;

/// What the chat screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatView {
    /// Full conversation, creation timestamp ascending.
    pub messages: Vec<Message>,
    /// `None` until the peer lookup finished.
    pub peer_name: Option<String>,
    pub input: String,
}

pub(crate) type SharedView = Arc<RwLock<ChatView>>;

// The view only holds plain data, so a poisoned lock is still usable.
pub(crate) fn read_view(view: &SharedView) -> RwLockReadGuard<'_, ChatView> {
    view.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_view(view: &SharedView) -> RwLockWriteGuard<'_, ChatView> {
    view.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Unsubscribed,
    Streaming,
}

pub struct ChatScreen<S: DocumentStore, P: PeerDirectory> {
    me: Option<UserId>,
    peer: Option<UserId>,
    store: Arc<S>,
    directory: Arc<P>,
    events: EventSender,
    view: SharedView,
    peer_task: Option<JoinHandle<()>>,
    feed_task: Option<JoinHandle<()>>,
}

impl<S: DocumentStore, P: PeerDirectory> ChatScreen<S, P> {
    /// `me` comes from the session and `peer` from the route; either may be
    /// missing, in which case the screen renders but stays idle.
    pub fn new(
        me: Option<UserId>,
        peer: Option<UserId>,
        store: Arc<S>,
        directory: Arc<P>,
        events: EventSender,
    ) -> Self {
        Self {
            me,
            peer,
            store,
            directory,
            events,
            view: Arc::new(RwLock::new(ChatView::default())),
            peer_task: None,
            feed_task: None,
        }
    }

    /// Both ids are needed to address the conversation.
    pub fn conversation(&self) -> Option<ConversationKey> {
        match (&self.me, &self.peer) {
            (Some(me), Some(peer)) => Some(ConversationKey::between(me, peer)),
            _ => None,
        }
    }

    pub fn me(&self) -> Option<&UserId> {
        self.me.as_ref()
    }

    pub fn peer(&self) -> Option<&UserId> {
        self.peer.as_ref()
    }

    pub fn view(&self) -> ChatView {
        read_view(&self.view).clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        read_view(&self.view).messages.clone()
    }

    pub fn peer_name(&self) -> Option<String> {
        read_view(&self.view).peer_name.clone()
    }

    pub fn input(&self) -> String {
        read_view(&self.view).input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        write_view(&self.view).input = text.into();
    }

    pub fn feed_state(&self) -> FeedState {
        match &self.feed_task {
            Some(task) if !task.is_finished() => FeedState::Streaming,
            _ => FeedState::Unsubscribed,
        }
    }

    /// Start peer resolution and the feed subscription. Mounting twice is a
    /// no-op. Only a failure to open the subscription is an error.
    pub async fn mount(&mut self) -> Result<(), ChatError> {
        self.spawn_peer_resolution();

        if self.feed_state() == FeedState::Streaming {
            return Ok(());
        }
        let (Some(key), Some(me)) = (self.conversation(), self.me.clone()) else {
            debug!("Chat mounted without both participants, feed stays idle");
            return Ok(());
        };

        let subscription = self.store.subscribe(&key).await?;
        info!(conversation = %key, "Chat feed streaming");

        let worker = FeedWorker {
            store: self.store.clone(),
            key,
            reconciler: FeedReconciler::new(me),
            view: self.view.clone(),
            events: self.events.clone(),
        };
        self.feed_task = Some(tokio::spawn(worker.run(subscription)));
        Ok(())
    }

    fn spawn_peer_resolution(&mut self) {
        if self.peer_task.is_some() {
            return;
        }
        let Some(peer) = self.peer.clone() else {
            return;
        };

        let directory = self.directory.clone();
        let view = self.view.clone();
        let events = self.events.clone();
        self.peer_task = Some(tokio::spawn(async move {
            let name = resolve_peer_name(directory.as_ref(), &peer).await;
            write_view(&view).peer_name = Some(name.clone());
            emit_event(&events, UiEvent::PeerResolved { name });
        }));
    }

    /// Cancel the subscription and drop the local feed. Returns once the
    /// subscription is released.
    pub async fn unmount(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
            // The subscription lives inside the task and is dropped with it.
            let _ = task.await;
            info!("Chat feed unsubscribed");
        }
        if let Some(task) = self.peer_task.take() {
            task.abort();
        }
        write_view(&self.view).messages.clear();
    }
}

impl<S: DocumentStore, P: PeerDirectory> Drop for ChatScreen<S, P> {
    fn drop(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
        if let Some(task) = self.peer_task.take() {
            task.abort();
        }
    }
}
