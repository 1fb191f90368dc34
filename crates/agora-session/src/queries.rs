use crate::models::{AuthorRow, KvRow};
use crate::{KEY_ACCESS_TOKEN, KEY_CSRF_TOKEN, KEY_REFRESH_TOKEN, KEY_USER, SessionStore};
use agora_types::api::{AuthResponse, Credentials, SessionUser};
use agora_types::models::{Author, UserId};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

impl SessionStore {
    // -- Key/value --

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| query_value(conn, key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                (key, value),
            )?;
            Ok(())
        })
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
            Ok(())
        })
    }

    pub fn entries(&self) -> Result<Vec<KvRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value, updated_at FROM kv ORDER BY key")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(KvRow {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Session --

    /// Persist profile and tokens from a login or registration response.
    pub fn save_login(&self, resp: &AuthResponse) -> Result<SessionUser> {
        let user = SessionUser::from(resp);
        let user_json = serde_json::to_string(&user)?;
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for (key, value) in [
                (KEY_USER, user_json.as_str()),
                (KEY_ACCESS_TOKEN, resp.tokens.access.as_str()),
                (KEY_REFRESH_TOKEN, resp.tokens.refresh.as_str()),
            ] {
                tx.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                    (key, value),
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;
        Ok(user)
    }

    pub fn save_user(&self, user: &SessionUser) -> Result<()> {
        self.set(KEY_USER, &serde_json::to_string(user)?)
    }

    pub fn save_csrf(&self, token: &str) -> Result<()> {
        self.set(KEY_CSRF_TOKEN, token)
    }

    pub fn user(&self) -> Result<Option<SessionUser>> {
        match self.get(KEY_USER)? {
            Some(json) => {
                let user = serde_json::from_str(&json).context("stored user profile is corrupt")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        self.with_conn(|conn| {
            Ok(Credentials {
                access_token: query_value(conn, KEY_ACCESS_TOKEN)?,
                refresh_token: query_value(conn, KEY_REFRESH_TOKEN)?,
                csrf_token: query_value(conn, KEY_CSRF_TOKEN)?,
            })
        })
    }

    /// Forget the signed-in user. The CSRF token is not tied to a login.
    pub fn clear_login(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE key IN (?1, ?2, ?3)",
                (KEY_USER, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN),
            )?;
            Ok(())
        })
    }

    // -- Author cache --

    pub fn remember_author(&self, author: &Author) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO authors (id, name, avatar, role) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    avatar = excluded.avatar,
                    role = excluded.role,
                    seen_at = datetime('now')",
                rusqlite::params![author.id, author.name, author.avatar, author.role.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn cached_author(&self, id: UserId) -> Result<Option<Author>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, avatar, role, seen_at FROM authors WHERE id = ?1",
                    [id],
                    map_author_row,
                )
                .optional()?;
            Ok(row.map(Author::from))
        })
    }

    /// All cached authors, most recently seen first.
    pub fn cached_authors(&self) -> Result<Vec<Author>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, avatar, role, seen_at FROM authors ORDER BY seen_at DESC, id",
            )?;
            let rows = stmt
                .query_map([], map_author_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Author::from).collect())
        })
    }
}

fn query_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

fn map_author_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuthorRow> {
    Ok(AuthorRow {
        id: row.get(0)?,
        name: row.get(1)?,
        avatar: row.get(2)?,
        role: row.get(3)?,
        seen_at: row.get(4)?,
    })
}
