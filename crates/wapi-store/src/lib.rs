//! # wapi-store
//!
//! Local storage for the Wapi Na Lini client, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle with typed helpers for
//! the session key/value table, chat messages and notification records, and
//! an asynchronous [`DocumentStore`] abstraction for the real-time chat
//! backend. [`LocalDocumentStore`] implements that abstraction on top of the
//! database and pushes a full ordered snapshot to every subscriber after each
//! write.

pub mod database;
pub mod feed;
pub mod local;
pub mod messages;
pub mod migrations;
pub mod notifications;
pub mod session;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use feed::{ChangeKind, DocumentChange, DocumentStore, FeedSnapshot, Subscription};
pub use local::LocalDocumentStore;
