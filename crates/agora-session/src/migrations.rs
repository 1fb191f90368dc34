use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS authors (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            avatar      TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'user',
            seen_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_authors_name
            ON authors(name COLLATE NOCASE);
        ",
    )?;

    debug!("Session store migrations complete");
    Ok(())
}
