//! CRUD operations for chat [`Message`] documents.
//!
//! Rows are never deleted: soft-delete and read receipts are in-place
//! patches. The store assigns ids and timestamps. Timestamps are kept at
//! microsecond precision, the precision they are stored at, and inserts keep
//! them strictly increasing within a conversation. Soft-delete rewrites the
//! timestamp to the deletion time; any tie left that way is broken by
//! insertion order.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::params;

use wapi_shared::{ConversationKey, Message, MessageId, MessagePatch, NewMessage, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

const SELECT_COLUMNS: &str =
    "SELECT id, sender, receiver, content, timestamp, deleted, seen, delivered
     FROM messages";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Append a message to a conversation and return the stored document.
    pub fn insert_message(&self, key: &ConversationKey, new: NewMessage) -> Result<Message> {
        let now = stored_precision(Utc::now());
        let timestamp = match self.latest_timestamp(key)? {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };

        let message = new.into_message(MessageId::new(), timestamp);

        self.conn().execute(
            "INSERT INTO messages
                (id, conversation, sender, receiver, content, timestamp, deleted, seen, delivered)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id.to_string(),
                key.as_str(),
                message.sender.as_str(),
                message.receiver.as_str(),
                message.content,
                format_ts(&message.timestamp),
                message.deleted,
                message.seen,
                message.delivered,
            ],
        )?;
        Ok(message)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All messages of a conversation, oldest first.
    pub fn list_messages(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE conversation = ?1
             ORDER BY timestamp ASC, seq ASC"
        ))?;

        let rows = stmt.query_map(params![key.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message(&self, key: &ConversationKey, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE conversation = ?1 AND id = ?2"),
                params![key.as_str(), id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    fn latest_timestamp(&self, key: &ConversationKey) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<String> = self.conn().query_row(
            "SELECT MAX(timestamp) FROM messages WHERE conversation = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        latest.as_deref().map(parse_ts).transpose()
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a field-level patch and return the updated document.
    pub fn update_message(
        &self,
        key: &ConversationKey,
        id: MessageId,
        patch: &MessagePatch,
    ) -> Result<Message> {
        let mut message = self.get_message(key, id)?;
        message.apply(patch);
        message.timestamp = stored_precision(message.timestamp);

        self.conn().execute(
            "UPDATE messages
             SET content = ?1, deleted = ?2, seen = ?3, timestamp = ?4
             WHERE conversation = ?5 AND id = ?6",
            params![
                message.content,
                message.deleted,
                message.seen,
                format_ts(&message.timestamp),
                key.as_str(),
                id.to_string(),
            ],
        )?;
        Ok(message)
    }
}

/// Drop sub-microsecond digits so a returned document equals its stored copy.
pub(crate) fn stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender: String = row.get(1)?;
    let receiver: String = row.get(2)?;
    let ts_str: String = row.get(4)?;

    let parse_time = |idx: usize, s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    };

    Ok(Message {
        id: id_str.parse().map_err(|e| conversion_error(0, e))?,
        sender: UserId::new(sender).map_err(|e| conversion_error(1, e))?,
        receiver: UserId::new(receiver).map_err(|e| conversion_error(2, e))?,
        content: row.get(3)?,
        timestamp: parse_time(4, &ts_str)?,
        deleted: row.get(5)?,
        seen: row.get(6)?,
        delivered: row.get(7)?,
    })
}
