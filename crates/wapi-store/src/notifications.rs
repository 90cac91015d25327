//! CRUD operations for [`Notification`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use wapi_shared::{NewNotification, Notification, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::messages::{format_ts, stored_precision};

impl Database {
    pub fn insert_notification(&self, new: NewNotification) -> Result<Notification> {
        let notification = new.into_notification(Uuid::new_v4(), stored_precision(Utc::now()));

        self.conn().execute(
            "INSERT INTO notifications (id, user_id, text, timestamp, read, link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.id.to_string(),
                notification.user_id.as_str(),
                notification.text,
                format_ts(&notification.timestamp),
                notification.read,
                notification.link,
            ],
        )?;
        Ok(notification)
    }

    /// Notifications addressed to `user`, newest first.
    pub fn list_notifications(&self, user: &UserId) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, text, timestamp, read, link
             FROM notifications
             WHERE user_id = ?1
             ORDER BY timestamp DESC",
        )?;

        let rows = stmt.query_map(params![user.as_str()], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    /// Flag every notification of `user` as read. Returns how many changed.
    pub fn mark_notifications_read(&self, user: &UserId) -> Result<usize> {
        Ok(self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            params![user.as_str()],
        )?)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id_str: String = row.get(0)?;
    let user: String = row.get(1)?;
    let ts_str: String = row.get(3)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_id = UserId::new(user).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Notification {
        id,
        user_id,
        text: row.get(2)?,
        timestamp,
        read: row.get(4)?,
        link: row.get(5)?,
    })
}
