//! Key/value rows backing the client session.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn get_session_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM session WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_session_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO session (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_session_value(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM session WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// Every stored session entry.
    pub fn session_values(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn().prepare("SELECT key, value FROM session")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }

    /// Remove every session entry. Returns how many were dropped.
    pub fn clear_session(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM session", [])?)
    }
}
