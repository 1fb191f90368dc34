use std::collections::HashMap;

use tracing::warn;

use agora_types::models::{Message, MessageId, Post, Reply};

/// A post as it came off the wire, before replies are grouped.
#[derive(Debug, Clone)]
pub struct Entry {
    pub post: Post,
    pub parent: Option<i64>,
    pub pinned: bool,
}

/// The ordered message list a forum view renders.
///
/// Top-level messages are kept pinned first, then newest first. Replies under
/// each message are kept oldest first.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group replies under their parents and sort. Replies whose parent chain
    /// does not end at a top-level message in `entries` are dropped; the
    /// number dropped is returned alongside the list.
    pub fn assemble(entries: Vec<Entry>) -> (Self, usize) {
        let parents: HashMap<i64, Option<i64>> = entries
            .iter()
            .filter_map(|e| e.post.id.server().map(|id| (id, e.parent)))
            .collect();

        let mut messages = Vec::new();
        let mut replies = Vec::new();
        for entry in entries {
            match entry.parent {
                None => messages.push(Message {
                    post: entry.post,
                    pinned: entry.pinned,
                    replies: Vec::new(),
                }),
                Some(parent) => replies.push((entry.post, parent)),
            }
        }

        let index: HashMap<i64, usize> = messages
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.id().server().map(|id| (id, i)))
            .collect();

        let mut orphans = 0;
        for (post, parent) in replies {
            let root = root_of(parent, &parents);
            match root.and_then(|root| index.get(&root).map(|&i| (root, i))) {
                Some((root, i)) => messages[i].replies.push(Reply { post, parent: root }),
                None => {
                    warn!("Dropping reply {} with unknown parent {}", post.id, parent);
                    orphans += 1;
                }
            }
        }

        let mut list = Self { messages };
        for message in &mut list.messages {
            sort_replies(&mut message.replies);
        }
        list.sort();
        (list, orphans)
    }

    /// Stable sort: pinned before unpinned, newest first within each group.
    pub fn sort(&mut self) {
        self.messages.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.post.created_at.cmp(&a.post.created_at))
        });
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id() == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.position(id).is_some()
    }

    pub fn insert(&mut self, message: Message) {
        self.messages.push(message);
        self.sort();
    }

    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let pos = self.position(id)?;
        Some(self.messages.remove(pos))
    }

    /// Swap the message at `id` for `message` in one step, so it is never
    /// present twice or missing.
    pub fn replace(&mut self, id: MessageId, message: Message) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.messages[pos] = message;
                self.sort();
                true
            }
            None => false,
        }
    }

    /// Any post, top-level or reply, by id.
    pub fn find_post(&self, id: MessageId) -> Option<&Post> {
        self.messages.iter().find_map(|m| {
            if m.id() == id {
                Some(&m.post)
            } else {
                m.reply(id).map(|r| &r.post)
            }
        })
    }

    pub fn find_post_mut(&mut self, id: MessageId) -> Option<&mut Post> {
        self.messages.iter_mut().find_map(|m| {
            if m.post.id == id {
                Some(&mut m.post)
            } else {
                m.reply_mut(id).map(|r| &mut r.post)
            }
        })
    }

    /// The top-level message a reply belongs to.
    pub fn parent_of(&self, reply: MessageId) -> Option<MessageId> {
        self.messages
            .iter()
            .find(|m| m.reply(reply).is_some())
            .map(Message::id)
    }

    /// Remove a post wherever it sits. Removing a top-level message drops its
    /// replies with it.
    pub fn remove_post(&mut self, id: MessageId) -> Option<Post> {
        if let Some(message) = self.remove(id) {
            return Some(message.post);
        }
        for message in &mut self.messages {
            if let Some(pos) = message.replies.iter().position(|r| r.post.id == id) {
                return Some(message.replies.remove(pos).post);
            }
        }
        None
    }
}

/// Walk up the parent chain to the top-level ancestor. Cycles and chains
/// through unknown messages yield `None`.
fn root_of(parent: i64, parents: &HashMap<i64, Option<i64>>) -> Option<i64> {
    let mut current = parent;
    for _ in 0..=parents.len() {
        match parents.get(&current)? {
            None => return Some(current),
            Some(next) => current = *next,
        }
    }
    None
}

pub fn sort_replies(replies: &mut [Reply]) {
    replies.sort_by(|a, b| a.post.created_at.cmp(&b.post.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::models::{Author, Delivery, Reactions};
    use chrono::{DateTime, Duration, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minutes)
    }

    fn entry(id: i64, parent: Option<i64>, minutes: i64, pinned: bool) -> Entry {
        Entry {
            post: Post {
                id: MessageId::Server(id),
                delivery: Delivery::Confirmed,
                author: Author::placeholder(1),
                content: format!("message {}", id),
                created_at: at(minutes),
                edited: false,
                reactions: Reactions::default(),
                attachments: Vec::new(),
            },
            parent,
            pinned,
        }
    }

    fn ids(list: &MessageList) -> Vec<i64> {
        list.iter().filter_map(|m| m.id().server()).collect()
    }

    #[test]
    fn pinned_first_then_newest() {
        let (list, _) = MessageList::assemble(vec![
            entry(1, None, 0, false),
            entry(2, None, 10, false),
            entry(3, None, 5, true),
            entry(4, None, 1, true),
            entry(5, None, 20, false),
        ]);
        assert_eq!(ids(&list), vec![3, 4, 5, 2, 1]);

        let msgs = list.as_slice();
        let first_unpinned = msgs.iter().position(|m| !m.pinned).unwrap();
        assert!(msgs[..first_unpinned].iter().all(|m| m.pinned));
        assert!(msgs[first_unpinned..].iter().all(|m| !m.pinned));
        for group in [&msgs[..first_unpinned], &msgs[first_unpinned..]] {
            assert!(group.windows(2).all(|w| w[0].post.created_at >= w[1].post.created_at));
        }
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let (list, _) = MessageList::assemble(vec![
            entry(1, None, 3, false),
            entry(2, None, 3, false),
            entry(3, None, 3, false),
        ]);
        assert_eq!(ids(&list), vec![1, 2, 3]);
    }

    #[test]
    fn replies_grouped_oldest_first() {
        let (list, orphans) = MessageList::assemble(vec![
            entry(1, None, 0, false),
            entry(3, Some(1), 9, false),
            entry(2, Some(1), 4, false),
        ]);
        assert_eq!(orphans, 0);
        assert_eq!(list.len(), 1);
        let replies: Vec<_> = list.as_slice()[0]
            .replies
            .iter()
            .filter_map(|r| r.post.id.server())
            .collect();
        assert_eq!(replies, vec![2, 3]);
    }

    #[test]
    fn orphans_dropped_and_nested_replies_rehomed() {
        let (list, orphans) = MessageList::assemble(vec![
            entry(1, None, 0, false),
            entry(2, Some(1), 1, false),
            entry(3, Some(2), 2, false),
            entry(4, Some(99), 3, false),
        ]);
        assert_eq!(orphans, 1);
        let message = &list.as_slice()[0];
        assert_eq!(message.replies.len(), 2);
        assert!(message.replies.iter().all(|r| r.parent == 1));
    }

    #[test]
    fn parent_cycles_are_orphans() {
        let (list, orphans) = MessageList::assemble(vec![
            entry(1, Some(2), 0, false),
            entry(2, Some(1), 1, false),
        ]);
        assert!(list.is_empty());
        assert_eq!(orphans, 2);
    }

    #[test]
    fn remove_post_finds_replies() {
        let (mut list, _) = MessageList::assemble(vec![
            entry(1, None, 0, false),
            entry(2, Some(1), 1, false),
        ]);
        assert_eq!(list.parent_of(MessageId::Server(2)), Some(MessageId::Server(1)));
        assert!(list.remove_post(MessageId::Server(2)).is_some());
        assert!(list.as_slice()[0].replies.is_empty());
        assert!(list.remove_post(MessageId::Server(2)).is_none());
        assert_eq!(list.remove_post(MessageId::Server(1)).map(|p| p.content), Some("message 1".into()));
        assert!(list.is_empty());
    }

    #[test]
    fn replace_keeps_single_copy() {
        let (mut list, _) = MessageList::assemble(vec![entry(1, None, 0, false)]);
        let mut confirmed = list.as_slice()[0].clone();
        confirmed.post.id = MessageId::Server(7);

        assert!(list.replace(MessageId::Server(1), confirmed));
        assert_eq!(ids(&list), vec![7]);
        assert!(!list.contains(MessageId::Server(1)));
    }
}
