use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = i64;
pub type ForumId = i64;

// -- Users --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    /// Admins and moderators may edit, delete and pin other people's posts.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }

    /// Lenient parse; anything unrecognised is a plain user.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "moderator" => Role::Moderator,
            _ => Role::User,
        }
    }
}

/// Author projection attached to every post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub role: Role,
}

impl Author {
    /// Synthesized stand-in used when nothing better is known about a user.
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            name: format!("User {}", id),
            avatar: default_avatar(&format!("User {}", id)),
            role: Role::User,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == format!("User {}", self.id)
    }
}

pub fn default_avatar(name: &str) -> String {
    format!("https://ui-avatars.com/api/?name={}", name.replace(' ', "+"))
}

// -- Forums --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    pub id: ForumId,
    pub name: String,
    pub description: String,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub created_by: Option<UserId>,
    pub locked: bool,
    pub message_count: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub user: UserId,
    pub forum: ForumId,
    pub joined_at: Option<DateTime<Utc>>,
}

/// A list response after shape normalisation. The API answers either with a
/// bare array or with a `{count, next, previous, results}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> Page<T> {
    pub fn total_pages(&self, page_size: u32) -> u32 {
        let page_size = u64::from(page_size.max(1));
        let total = self.count.unwrap_or(self.results.len() as u64);
        (total.div_ceil(page_size) as u32).max(1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            count: self.count,
            next: self.next,
            previous: self.previous,
        }
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(results: Vec<T>) -> Self {
        Self {
            results,
            count: None,
            next: None,
            previous: None,
        }
    }
}

// -- Messages --

/// Identity of a post. Optimistic entries carry a client-generated id until
/// the server assigns the real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageId {
    Local(Uuid),
    Server(i64),
}

impl MessageId {
    pub fn server(self) -> Option<i64> {
        match self {
            MessageId::Server(id) => Some(id),
            MessageId::Local(_) => None,
        }
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        MessageId::Server(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Local(id) => write!(f, "local:{}", id),
            MessageId::Server(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Delivery {
    Pending,
    Confirmed,
    Failed { reason: String },
}

/// Emoji -> users who reacted with it. Each user appears at most once per
/// emoji, and emojis nobody reacted with are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reactions(BTreeMap<String, BTreeSet<UserId>>);

impl Reactions {
    /// Flip `user` in or out of the set for `emoji`. Returns true if added.
    pub fn toggle(&mut self, emoji: &str, user: UserId) -> bool {
        let users = self.0.entry(emoji.to_string()).or_default();
        let added = users.insert(user);
        if !added {
            users.remove(&user);
            if users.is_empty() {
                self.0.remove(emoji);
            }
        }
        added
    }

    pub fn has_reacted(&self, emoji: &str, user: UserId) -> bool {
        self.0.get(emoji).is_some_and(|users| users.contains(&user))
    }

    pub fn count(&self, emoji: &str) -> usize {
        self.0.get(emoji).map_or(0, BTreeSet::len)
    }

    pub fn total(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<UserId>)> {
        self.0.iter().map(|(emoji, users)| (emoji.as_str(), users))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// Fields shared by top-level messages and replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: MessageId,
    pub delivery: Delivery,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub reactions: Reactions,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(flatten)]
    pub post: Post,
    pub pinned: bool,
    pub replies: Vec<Reply>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.post.id
    }

    pub fn reply(&self, id: MessageId) -> Option<&Reply> {
        self.replies.iter().find(|r| r.post.id == id)
    }

    pub fn reply_mut(&mut self, id: MessageId) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.post.id == id)
    }
}

/// A reply has the shape of a message minus its own replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(flatten)]
    pub post: Post,
    pub parent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_twice_restores_reactions() {
        let mut reactions = Reactions::default();
        reactions.toggle("👍", 7);
        let before = reactions.clone();

        assert!(reactions.toggle("🎉", 1));
        assert!(reactions.has_reacted("🎉", 1));
        assert!(!reactions.toggle("🎉", 1));
        assert_eq!(reactions, before);
    }

    #[test]
    fn reaction_user_counted_once() {
        let mut reactions = Reactions::default();
        reactions.toggle("👍", 1);
        reactions.toggle("👍", 2);
        assert_eq!(reactions.count("👍"), 2);
        assert_eq!(reactions.total(), 2);
        reactions.toggle("👍", 1);
        assert_eq!(reactions.count("👍"), 1);
    }

    #[test]
    fn placeholder_author() {
        let author = Author::placeholder(42);
        assert_eq!(author.name, "User 42");
        assert_eq!(author.avatar, "https://ui-avatars.com/api/?name=User+42");
        assert_eq!(author.role, Role::User);
        assert!(author.is_placeholder());
    }

    #[test]
    fn unknown_role_is_plain_user() {
        let role: Role = serde_json::from_str("\"superuser\"").unwrap();
        assert_eq!(role, Role::User);
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert!(role.can_moderate());
    }

    #[test]
    fn total_pages_uses_count_when_present() {
        let page = Page {
            results: vec![1, 2, 3],
            count: Some(25),
            next: None,
            previous: None,
        };
        assert_eq!(page.total_pages(10), 3);

        let bare: Page<i32> = Page::from(vec![]);
        assert_eq!(bare.total_pages(10), 1);
    }
}
