use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use agora_session::SessionStore;
use agora_types::models::{Author, UserId};

/// Directory of users seen before. Looked up after payload detail and before
/// any remote fetch when decorating authors.
pub trait UserResolver: Send + Sync {
    fn resolve(&self, id: UserId) -> Option<Author>;

    fn remember(&self, author: &Author);

    /// Everyone the directory knows about, for mention suggestions.
    fn known(&self) -> Vec<Author>;
}

impl UserResolver for SessionStore {
    fn resolve(&self, id: UserId) -> Option<Author> {
        match self.cached_author(id) {
            Ok(author) => author,
            Err(e) => {
                warn!("Author cache lookup for {} failed: {}", id, e);
                None
            }
        }
    }

    fn remember(&self, author: &Author) {
        if author.is_placeholder() {
            return;
        }
        if let Err(e) = self.remember_author(author) {
            warn!("Failed to cache author {}: {}", author.id, e);
        }
    }

    fn known(&self) -> Vec<Author> {
        self.cached_authors().unwrap_or_else(|e| {
            warn!("Failed to read author cache: {}", e);
            Vec::new()
        })
    }
}

impl<R: UserResolver + ?Sized> UserResolver for Arc<R> {
    fn resolve(&self, id: UserId) -> Option<Author> {
        (**self).resolve(id)
    }

    fn remember(&self, author: &Author) {
        (**self).remember(author)
    }

    fn known(&self) -> Vec<Author> {
        (**self).known()
    }
}

/// Process-local directory for when no session file is configured.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    authors: Mutex<HashMap<UserId, Author>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authors(authors: impl IntoIterator<Item = Author>) -> Self {
        let resolver = Self::new();
        for author in authors {
            resolver.remember(&author);
        }
        resolver
    }
}

impl UserResolver for MemoryResolver {
    fn resolve(&self, id: UserId) -> Option<Author> {
        let authors = self.authors.lock().ok()?;
        authors.get(&id).cloned()
    }

    fn remember(&self, author: &Author) {
        if author.is_placeholder() {
            return;
        }
        if let Ok(mut authors) = self.authors.lock() {
            authors.insert(author.id, author.clone());
        }
    }

    fn known(&self) -> Vec<Author> {
        let Ok(authors) = self.authors.lock() else {
            return Vec::new();
        };
        let mut known: Vec<Author> = authors.values().cloned().collect();
        known.sort_by(|a, b| a.name.cmp(&b.name));
        known
    }
}
