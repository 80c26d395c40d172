//! SQL schema for the bundled `threads` table.
//!
//! Executed once at connection startup. Custom templates may target any
//! other table; this one only backs [`crate::DEFAULT_QUERY`].

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per completed thread. Rows are only ever inserted.
CREATE TABLE IF NOT EXISTS threads (
    row_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    queue_id     TEXT    NOT NULL,
    message_id   TEXT    NOT NULL DEFAULT '',
    sender       TEXT    NOT NULL DEFAULT '',
    client_ip    TEXT    NOT NULL DEFAULT '',
    accepted_at  TEXT,              -- '%Y-%m-%d %H:%M:%S' syslog time or NULL
    spam_score   INTEGER NOT NULL DEFAULT 0,
    recorded_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS threads_queue_idx   ON threads(queue_id);
CREATE INDEX IF NOT EXISTS threads_message_idx ON threads(message_id);

PRAGMA user_version = 1;
";
