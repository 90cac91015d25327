//! v001 -- Initial schema creation.
//!
//! Creates the `session`, `messages` and `notifications` tables.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Session (persistent key/value, wiped on logout)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS session (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Messages (chats/{conversation}/messages)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    id           TEXT UNIQUE NOT NULL,        -- UUID v4
    conversation TEXT NOT NULL,               -- sorted "a_b" key
    sender       TEXT NOT NULL,
    receiver     TEXT NOT NULL,
    content      TEXT NOT NULL,
    timestamp    TEXT NOT NULL,               -- RFC-3339, fixed micros, UTC
    deleted      INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    seen         INTEGER NOT NULL DEFAULT 0,
    delivered    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation, timestamp ASC, seq ASC);

-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id        TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id   TEXT NOT NULL,
    text      TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    read      INTEGER NOT NULL DEFAULT 0,
    link      TEXT
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_ts
    ON notifications(user_id, timestamp DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
