use tokio::sync::mpsc;

use wapi_shared::{ConversationKey, Message};

use crate::alerts::AlertRequest;
use crate::routes::Route;

/// Everything a screen pushes to the shell around it.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Show a transient alert.
    Alert(AlertRequest),
    /// A chat feed was replaced with a new snapshot.
    FeedUpdated {
        conversation: ConversationKey,
        messages: Vec<Message>,
    },
    /// The peer's display name is known (or fell back).
    PeerResolved { name: String },
    Navigate(Route),
}

pub type EventSender = mpsc::UnboundedSender<UiEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<UiEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

pub fn emit_event(tx: &EventSender, event: UiEvent) {
    if let Err(e) = tx.send(event) {
        tracing::debug!(event = ?e.0, "UI gone, dropping event");
    }
}
