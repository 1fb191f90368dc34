use agora_types::models::{Author, Role};

/// Row types that map directly to SQLite rows.
/// Distinct from agora-types models to keep the storage layer independent.

pub struct KvRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

pub struct AuthorRow {
    pub id: i64,
    pub name: String,
    pub avatar: String,
    pub role: String,
    pub seen_at: String,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: row.id,
            name: row.name,
            avatar: row.avatar,
            role: Role::parse(&row.role),
        }
    }
}
