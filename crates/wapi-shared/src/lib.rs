//! # wapi-shared
//!
//! Types shared by the Wapi Na Lini storage and client crates: identifiers,
//! the conversation key, chat message and notification models, and the
//! constants both sides agree on.

pub mod constants;
pub mod error;
pub mod models;
pub mod token;
pub mod types;

pub use error::WapiError;
pub use models::{Message, MessagePatch, NewMessage, NewNotification, Notification};
pub use types::{ConversationKey, MessageId, UserId};
