use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use agora_api::{ApiError, ForumBackend};
use agora_types::api::{CreateMessageRequest, MessageFilter, MessagePayload, UpdateForumRequest, UpdateMessageRequest};
use agora_types::events::DiscussionEvent;
use agora_types::models::{
    Attachment, Author, Delivery, Forum, ForumId, Message, MessageId, Post, Reactions, Reply, UserId,
};

use crate::config::DiscussionConfig;
use crate::error::{DiscussionError, Rejection, Result};
use crate::mention::{Composer, mentioned_names};
use crate::notifier::Notifier;
use crate::resolver::UserResolver;
use crate::state::{Entry, MessageList, sort_replies};

/// Ticket for an optimistic post that is on screen but not yet confirmed.
/// Hand it back to [`Discussion::complete_post`] with the server's answer.
#[derive(Debug)]
pub struct PendingPost {
    local_id: Uuid,
    forum: ForumId,
    parent: Option<i64>,
    key: String,
    request: CreateMessageRequest,
}

impl PendingPost {
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn message_id(&self) -> MessageId {
        MessageId::Local(self.local_id)
    }

    pub fn forum(&self) -> ForumId {
        self.forum
    }

    pub fn parent(&self) -> Option<i64> {
        self.parent
    }

    /// The create call to send.
    pub fn request(&self) -> &CreateMessageRequest {
        &self.request
    }
}

/// State behind one open forum view.
///
/// Every handler mutates the local list first and reconciles with the server
/// afterwards. On failure the local change is rolled back, an `Alert` event is
/// published and the error is returned. Handlers that refuse to act return
/// [`DiscussionError::Rejected`] without touching state or the network.
pub struct Discussion<B, R> {
    backend: B,
    resolver: R,
    config: DiscussionConfig,
    notifier: Notifier,
    viewer: Author,
    forum: Option<Forum>,
    messages: MessageList,
    known: HashMap<UserId, Author>,
    banned: BTreeSet<UserId>,
    in_flight: HashSet<String>,
    failed: Option<Post>,
}

impl<B: ForumBackend, R: UserResolver> Discussion<B, R> {
    pub fn new(backend: B, resolver: R, viewer: Author, config: DiscussionConfig) -> Self {
        let mut known = HashMap::new();
        known.insert(viewer.id, viewer.clone());
        Self {
            backend,
            resolver,
            config,
            notifier: Notifier::new(),
            viewer,
            forum: None,
            messages: MessageList::new(),
            known,
            banned: BTreeSet::new(),
            in_flight: HashSet::new(),
            failed: None,
        }
    }

    /// Publish on an existing notifier instead of a private one.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    // -- Accessors --

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn post(&self, id: MessageId) -> Option<&Post> {
        self.messages.find_post(id)
    }

    pub fn forum(&self) -> Option<&Forum> {
        self.forum.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.forum.as_ref().is_some_and(|f| f.locked)
    }

    pub fn viewer(&self) -> &Author {
        &self.viewer
    }

    pub fn config(&self) -> &DiscussionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DiscussionEvent> {
        self.notifier.subscribe()
    }

    /// The last optimistic post that the server refused, marked `Failed`, so
    /// the composer can offer its text again.
    pub fn take_failed(&mut self) -> Option<Post> {
        self.failed.take()
    }

    // -- Permissions --

    pub fn can_moderate(&self) -> bool {
        self.viewer.role.can_moderate()
    }

    pub fn is_forum_owner(&self) -> bool {
        self.forum
            .as_ref()
            .is_some_and(|f| f.created_by == Some(self.viewer.id))
    }

    /// Authors may edit and delete their own posts; moderators anyone's.
    pub fn can_edit(&self, post: &Post) -> bool {
        post.author.id == self.viewer.id || self.can_moderate()
    }

    /// Pinning and locking are open to moderators and the forum's creator.
    pub fn can_pin(&self) -> bool {
        self.can_moderate() || self.is_forum_owner()
    }

    // -- Load --

    /// Fetch the forum and its messages, replacing the current list. On
    /// failure the list is left empty.
    pub async fn load(&mut self, forum_id: ForumId) -> Result<usize> {
        let fetched = self.fetch(forum_id).await;
        self.in_flight.clear();
        self.failed = None;

        let (forum, mut payloads) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                self.forum = None;
                self.messages.clear();
                return Err(self.fail(DiscussionError::Load(e)));
            }
        };

        let authors = self.resolve_authors(&mut payloads).await;
        for author in authors.values() {
            self.learn(author);
        }

        let entries = payloads
            .into_iter()
            .map(|payload| {
                let id = payload.author_id().unwrap_or_default();
                let author = authors
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| Author::placeholder(id));
                entry_from(payload, author)
            })
            .collect();
        let (messages, orphans) = MessageList::assemble(entries);
        if orphans > 0 {
            warn!("Dropped {} orphan replies in forum {}", orphans, forum_id);
        }

        info!(
            "Loaded forum {} ({} messages, locked: {})",
            forum_id,
            messages.len(),
            forum.locked
        );
        self.forum = Some(forum);
        self.messages = messages;
        self.notifier.emit(DiscussionEvent::Loaded {
            forum_id,
            count: self.messages.len(),
        });
        Ok(self.messages.len())
    }

    async fn fetch(&self, forum_id: ForumId) -> std::result::Result<(Forum, Vec<MessagePayload>), ApiError> {
        let forum = Forum::from(self.backend.get_forum(forum_id).await?);

        let mut filter = MessageFilter::for_forum(forum_id);
        let mut payloads = Vec::new();
        loop {
            let page = self.backend.list_messages(&filter).await?;
            let more = page.next.is_some() && !page.results.is_empty();
            payloads.extend(page.results);
            if !more {
                break;
            }
            filter.page = Some(filter.page.unwrap_or(1) + 1);
        }
        Ok((forum, payloads))
    }

    /// Decorate every author: payload detail, then what we already know,
    /// then a remote lookup, then a placeholder.
    async fn resolve_authors(&self, payloads: &mut [MessagePayload]) -> HashMap<UserId, Author> {
        let mut authors = HashMap::new();
        let mut wanted = Vec::new();

        for payload in payloads.iter_mut() {
            let id = payload.author_id().unwrap_or_default();
            payload.user = Some(id);
            if let Some(detail) = payload.take_author_detail() {
                let author = detail.into_author(id);
                if !author.is_placeholder() {
                    authors.insert(id, author);
                    continue;
                }
            }
            wanted.push(id);
        }

        wanted.sort_unstable();
        wanted.dedup();
        let mut remote = Vec::new();
        for id in wanted {
            if authors.contains_key(&id) {
                continue;
            }
            match self.cached(id) {
                Some(author) => {
                    authors.insert(id, author);
                }
                None => remote.push(id),
            }
        }

        if self.config.resolve_authors && !remote.is_empty() {
            debug!("Fetching {} unknown authors", remote.len());
            let lookups = remote.iter().map(|&id| async move { (id, self.backend.fetch_user(id).await) });
            for (id, result) in join_all(lookups).await {
                let author = match result {
                    Ok(detail) => detail.into_author(id),
                    Err(e) => {
                        debug!("No detail for user {}: {}", id, e);
                        Author::placeholder(id)
                    }
                };
                authors.insert(id, author);
            }
        } else {
            for id in remote {
                authors.insert(id, Author::placeholder(id));
            }
        }

        authors
    }

    fn cached(&self, id: UserId) -> Option<Author> {
        self.known.get(&id).cloned().or_else(|| self.resolver.resolve(id))
    }

    /// Synchronous resolution for a single server response.
    fn author_for(&self, payload: &mut MessagePayload) -> Author {
        let id = payload.author_id().unwrap_or(self.viewer.id);
        if let Some(detail) = payload.take_author_detail() {
            let author = detail.into_author(id);
            if !author.is_placeholder() {
                return author;
            }
        }
        self.cached(id).unwrap_or_else(|| Author::placeholder(id))
    }

    fn lookup(&self, id: UserId) -> Author {
        self.cached(id).unwrap_or_else(|| Author::placeholder(id))
    }

    fn learn(&mut self, author: &Author) {
        if author.is_placeholder() {
            return;
        }
        self.known.insert(author.id, author.clone());
        self.resolver.remember(author);
    }

    // -- Posting --

    /// Insert an optimistic message. Send [`PendingPost::request`] and pass
    /// the outcome to [`Discussion::complete_post`].
    pub fn begin_post(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<PendingPost> {
        let forum_id = self.writable_forum()?;
        let content = non_blank(text)?;
        let key = self.claim(forum_id, None, &content)?;

        let local_id = Uuid::new_v4();
        let post = self.pending(local_id, content.clone(), attachments.clone());
        self.messages.insert(Message {
            post,
            pinned: false,
            replies: Vec::new(),
        });
        self.notifier.emit(DiscussionEvent::MessagePending { local_id });
        debug!("Message {} pending in forum {}", local_id, forum_id);

        Ok(PendingPost {
            local_id,
            forum: forum_id,
            parent: None,
            key,
            request: CreateMessageRequest {
                content,
                forum: forum_id,
                parent: None,
                attachments,
            },
        })
    }

    /// Insert an optimistic reply under `parent`. Replying to a reply lands
    /// under that reply's top-level message.
    pub fn begin_reply(&mut self, parent: MessageId, text: &str) -> Result<PendingPost> {
        let forum_id = self.writable_forum()?;
        let content = non_blank(text)?;

        let parent = match self.messages.get(parent) {
            Some(message) => message.id(),
            None => self
                .messages
                .parent_of(parent)
                .ok_or(Rejection::UnknownMessage)?,
        };
        let parent_id = parent.server().ok_or(Rejection::NotConfirmed)?;
        let key = self.claim(forum_id, Some(parent_id), &content)?;

        let local_id = Uuid::new_v4();
        let post = self.pending(local_id, content.clone(), Vec::new());
        if let Some(message) = self.messages.get_mut(parent) {
            message.replies.push(Reply {
                post,
                parent: parent_id,
            });
        }
        self.notifier.emit(DiscussionEvent::ReplyPending {
            parent: parent_id,
            local_id,
        });
        debug!("Reply {} pending under {}", local_id, parent_id);

        Ok(PendingPost {
            local_id,
            forum: forum_id,
            parent: Some(parent_id),
            key,
            request: CreateMessageRequest {
                content,
                forum: forum_id,
                parent: Some(parent_id),
                attachments: Vec::new(),
            },
        })
    }

    /// Swap the optimistic entry for the confirmed one, or remove it if the
    /// server refused. A ticket from a forum that is no longer open leaves
    /// the list alone.
    pub fn complete_post(
        &mut self,
        pending: PendingPost,
        result: std::result::Result<MessagePayload, ApiError>,
    ) -> Result<MessageId> {
        if self.forum.as_ref().map(|f| f.id) != Some(pending.forum) {
            return self.complete_elsewhere(pending, result);
        }
        self.in_flight.remove(&pending.key);
        match (pending.parent, result) {
            (None, Ok(payload)) => Ok(self.confirm_message(pending.local_id, payload)),
            (Some(parent), Ok(payload)) => Ok(self.confirm_reply(parent, pending.local_id, payload)),
            (None, Err(e)) => {
                self.roll_back(pending.local_id, &e);
                self.notifier.emit(DiscussionEvent::MessageFailed {
                    local_id: pending.local_id,
                    reason: e.to_string(),
                });
                Err(self.fail(DiscussionError::Send(e)))
            }
            (Some(parent), Err(e)) => {
                self.roll_back(pending.local_id, &e);
                self.notifier.emit(DiscussionEvent::ReplyFailed {
                    parent,
                    local_id: pending.local_id,
                    reason: e.to_string(),
                });
                Err(self.fail(DiscussionError::Reply(e)))
            }
        }
    }

    fn complete_elsewhere(
        &self,
        pending: PendingPost,
        result: std::result::Result<MessagePayload, ApiError>,
    ) -> Result<MessageId> {
        match result {
            Ok(payload) => {
                debug!(
                    "Post {} confirmed as {} in forum {}, which is no longer open",
                    pending.local_id, payload.id, pending.forum
                );
                Ok(MessageId::Server(payload.id))
            }
            Err(e) if pending.parent.is_some() => Err(self.fail(DiscussionError::Reply(e))),
            Err(e) => Err(self.fail(DiscussionError::Send(e))),
        }
    }

    pub async fn post_message(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<MessageId> {
        let pending = self.begin_post(text, attachments)?;
        let result = self.backend.create_message(pending.request()).await;
        self.complete_post(pending, result)
    }

    pub async fn post_reply(&mut self, parent: MessageId, text: &str) -> Result<MessageId> {
        let pending = self.begin_reply(parent, text)?;
        let result = self.backend.create_message(pending.request()).await;
        self.complete_post(pending, result)
    }

    fn confirm_message(&mut self, local_id: Uuid, mut payload: MessagePayload) -> MessageId {
        let author = self.author_for(&mut payload);
        self.learn(&author);
        let entry = entry_from(payload, author);
        let id = entry.post.id;
        let local = MessageId::Local(local_id);

        // Reactions and pins applied while pending carry over
        let (reactions, pinned) = self
            .messages
            .get(local)
            .map(|m| (m.post.reactions.clone(), m.pinned))
            .unwrap_or_default();
        let confirmed = Message {
            post: Post {
                reactions,
                ..entry.post
            },
            pinned: pinned || entry.pinned,
            replies: Vec::new(),
        };

        if self.messages.contains(id) {
            self.messages.remove(local);
        } else if self.messages.contains(local) {
            self.messages.replace(local, confirmed);
        } else {
            self.messages.insert(confirmed);
        }

        let server_id = id.server().unwrap_or_default();
        info!("Message {} confirmed as {}", local_id, server_id);
        self.notifier.emit(DiscussionEvent::MessageConfirmed {
            local_id,
            id: server_id,
        });
        id
    }

    fn confirm_reply(&mut self, parent: i64, local_id: Uuid, mut payload: MessagePayload) -> MessageId {
        let author = self.author_for(&mut payload);
        self.learn(&author);
        let entry = entry_from(payload, author);
        let id = entry.post.id;
        let local = MessageId::Local(local_id);

        match self.messages.get_mut(MessageId::Server(parent)) {
            Some(message) => {
                let reactions = message
                    .reply(local)
                    .map(|r| r.post.reactions.clone())
                    .unwrap_or_default();
                let confirmed = Reply {
                    post: Post {
                        reactions,
                        ..entry.post
                    },
                    parent,
                };
                message.replies.retain(|r| r.post.id != local && r.post.id != id);
                message.replies.push(confirmed);
                sort_replies(&mut message.replies);
            }
            None => warn!("Reply {} confirmed after its parent {} went away", local_id, parent),
        }

        let server_id = id.server().unwrap_or_default();
        info!("Reply {} confirmed as {} under {}", local_id, server_id, parent);
        self.notifier.emit(DiscussionEvent::ReplyConfirmed {
            parent,
            local_id,
            id: server_id,
        });
        id
    }

    fn roll_back(&mut self, local_id: Uuid, err: &ApiError) {
        warn!("Server refused post {}: {}", local_id, err);
        self.failed = self.messages.remove_post(MessageId::Local(local_id)).map(|post| Post {
            delivery: Delivery::Failed {
                reason: err.to_string(),
            },
            ..post
        });
    }

    // -- Edit / delete --

    /// Apply new text optimistically; reverted if the server refuses.
    pub async fn edit_message(&mut self, id: MessageId, text: &str) -> Result<()> {
        self.writable_forum()?;
        let content = non_blank(text)?;
        let server_id = self.confirmed(id)?;
        let post = self.messages.find_post(id).ok_or(Rejection::UnknownMessage)?;
        if !self.can_edit(post) {
            return Err(Rejection::NotPermitted.into());
        }
        if post.content == content {
            return Ok(());
        }

        let previous = match self.messages.find_post_mut(id) {
            Some(post) => std::mem::replace(&mut post.content, content.clone()),
            None => return Err(Rejection::UnknownMessage.into()),
        };

        let req = UpdateMessageRequest {
            content: Some(content),
            ..Default::default()
        };
        match self.backend.update_message(server_id, &req).await {
            Ok(payload) => {
                if let Some(post) = self.messages.find_post_mut(id) {
                    post.content = payload.content;
                    post.edited = true;
                }
                info!("Message {} edited", server_id);
                self.notifier.emit(DiscussionEvent::MessageEdited { id: server_id });
                Ok(())
            }
            Err(e) => {
                if let Some(post) = self.messages.find_post_mut(id) {
                    post.content = previous;
                }
                Err(self.fail(DiscussionError::Edit(e)))
            }
        }
    }

    /// Removed locally only once the server confirms. Deleting a message
    /// takes its replies with it.
    pub async fn delete_message(&mut self, id: MessageId) -> Result<()> {
        self.loaded_forum()?;
        let server_id = self.confirmed(id)?;
        let post = self.messages.find_post(id).ok_or(Rejection::UnknownMessage)?;
        if !self.can_edit(post) {
            return Err(Rejection::NotPermitted.into());
        }

        match self.backend.delete_message(server_id).await {
            Ok(()) => {
                self.messages.remove_post(id);
                info!("Message {} deleted", server_id);
                self.notifier.emit(DiscussionEvent::MessageDeleted { id: server_id });
                Ok(())
            }
            Err(e) => Err(self.fail(DiscussionError::Delete(e))),
        }
    }

    // -- Pins, reactions, lock, bans --

    /// Flip a top-level message's pin. Returns the new state.
    pub async fn toggle_pin(&mut self, id: MessageId) -> Result<bool> {
        self.loaded_forum()?;
        if !self.messages.contains(id) {
            return Err(Rejection::UnknownMessage.into());
        }
        if !self.can_pin() {
            return Err(Rejection::NotPermitted.into());
        }
        let server_id = match (self.config.sync_pins, id.server()) {
            (true, None) => return Err(Rejection::NotConfirmed.into()),
            (_, server_id) => server_id,
        };

        let pinned = self.set_pinned(id, None);
        if let (true, Some(server_id)) = (self.config.sync_pins, server_id) {
            let req = UpdateMessageRequest {
                is_pinned: Some(pinned),
                ..Default::default()
            };
            if let Err(e) = self.backend.update_message(server_id, &req).await {
                self.set_pinned(id, Some(!pinned));
                return Err(self.fail(DiscussionError::Pin(e)));
            }
        }
        Ok(pinned)
    }

    fn set_pinned(&mut self, id: MessageId, value: Option<bool>) -> bool {
        let Some(message) = self.messages.get_mut(id) else {
            return false;
        };
        let pinned = value.unwrap_or(!message.pinned);
        message.pinned = pinned;
        self.messages.sort();
        self.notifier.emit(DiscussionEvent::PinChanged { id, pinned });
        pinned
    }

    /// Toggle the viewer's `emoji` on a message, or on one of its replies.
    /// Local only. Returns true if the reaction was added.
    pub fn toggle_reaction(&mut self, target: MessageId, emoji: &str, reply: Option<MessageId>) -> Result<bool> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(Rejection::EmptyText.into());
        }
        let message = self.messages.get_mut(target).ok_or(Rejection::UnknownMessage)?;
        let post = match reply {
            None => &mut message.post,
            Some(reply) => &mut message.reply_mut(reply).ok_or(Rejection::UnknownMessage)?.post,
        };

        let added = post.reactions.toggle(emoji, self.viewer.id);
        self.notifier.emit(DiscussionEvent::ReactionToggled {
            target: reply.unwrap_or(target),
            emoji: emoji.to_string(),
            user_id: self.viewer.id,
            added,
        });
        Ok(added)
    }

    /// Lock or unlock the open forum. Returns the new state.
    pub async fn toggle_lock(&mut self) -> Result<bool> {
        let forum_id = self.loaded_forum()?;
        if !self.can_pin() {
            return Err(Rejection::NotPermitted.into());
        }
        let req = UpdateForumRequest {
            is_locked: Some(!self.is_locked()),
            ..Default::default()
        };

        match self.backend.update_forum(forum_id, &req).await {
            Ok(resp) => {
                let locked = resp.is_locked;
                if let Some(forum) = self.forum.as_mut() {
                    forum.locked = locked;
                }
                info!("Forum {} {}", forum_id, if locked { "locked" } else { "unlocked" });
                self.notifier.emit(DiscussionEvent::LockChanged { forum_id, locked });
                Ok(locked)
            }
            Err(e) => Err(self.fail(DiscussionError::Lock(e))),
        }
    }

    /// Flag a user's posts. Returns false if they were already banned.
    pub fn ban_user(&mut self, user_id: UserId) -> Result<bool> {
        if !self.can_moderate() || user_id == self.viewer.id {
            return Err(Rejection::NotPermitted.into());
        }
        let changed = self.banned.insert(user_id);
        if changed {
            self.notifier.emit(DiscussionEvent::BanChanged { user_id, banned: true });
        }
        Ok(changed)
    }

    pub fn unban_user(&mut self, user_id: UserId) -> Result<bool> {
        if !self.can_moderate() {
            return Err(Rejection::NotPermitted.into());
        }
        let changed = self.banned.remove(&user_id);
        if changed {
            self.notifier.emit(DiscussionEvent::BanChanged { user_id, banned: false });
        }
        Ok(changed)
    }

    pub fn is_banned(&self, user_id: UserId) -> bool {
        self.banned.contains(&user_id)
    }

    pub fn banned_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.banned.iter().copied()
    }

    // -- Mentions --

    /// Everyone who can be mentioned, by name.
    pub fn known_users(&self) -> Vec<Author> {
        let mut users: HashMap<UserId, Author> = self
            .resolver
            .known()
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        users.extend(self.known.iter().map(|(id, a)| (*id, a.clone())));

        let mut users: Vec<Author> = users.into_values().filter(|a| !a.is_placeholder()).collect();
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        users
    }

    /// Autocomplete candidates for the mention being typed in `composer`.
    pub fn mention_suggestions(&self, composer: &Composer) -> Vec<Author> {
        let users = self.known_users();
        composer.suggestions(&users).into_iter().cloned().collect()
    }

    /// Known users mentioned by name in `content`.
    pub fn mentioned_users(&self, content: &str) -> Vec<Author> {
        let users = self.known_users();
        mentioned_names(content)
            .iter()
            .filter_map(|name| users.iter().find(|u| u.name.eq_ignore_ascii_case(name)))
            .cloned()
            .collect()
    }

    /// Users the server recorded as mentioned in a message.
    pub async fn mentions_of(&self, id: MessageId) -> Result<Vec<Author>> {
        let server_id = self.confirmed(id)?;
        match self.backend.list_mentions(server_id).await {
            Ok(records) => Ok(records
                .into_iter()
                .map(|m| self.lookup(m.mentioned_user))
                .collect()),
            Err(e) => Err(self.fail(DiscussionError::Load(e))),
        }
    }

    // -- Helpers --

    fn loaded_forum(&self) -> Result<ForumId> {
        self.forum
            .as_ref()
            .map(|f| f.id)
            .ok_or_else(|| Rejection::NotLoaded.into())
    }

    fn writable_forum(&self) -> Result<ForumId> {
        let forum_id = self.loaded_forum()?;
        if self.is_locked() {
            debug!("Forum {} is locked, refusing write", forum_id);
            return Err(Rejection::Locked.into());
        }
        Ok(forum_id)
    }

    /// Server id of an existing post.
    fn confirmed(&self, id: MessageId) -> Result<i64> {
        let post = self.messages.find_post(id).ok_or(Rejection::UnknownMessage)?;
        match (post.id, &post.delivery) {
            (MessageId::Server(id), Delivery::Confirmed) => Ok(id),
            _ => Err(Rejection::NotConfirmed.into()),
        }
    }

    /// Reserve the idempotency key for a submission.
    fn claim(&mut self, forum_id: ForumId, parent: Option<i64>, content: &str) -> Result<String> {
        let key = submission_key(forum_id, parent, content);
        if !self.in_flight.insert(key.clone()) {
            debug!("Duplicate submission {} ignored", key);
            return Err(Rejection::DuplicateSubmission.into());
        }
        Ok(key)
    }

    fn pending(&self, local_id: Uuid, content: String, attachments: Vec<Attachment>) -> Post {
        Post {
            id: MessageId::Local(local_id),
            delivery: Delivery::Pending,
            author: self.viewer.clone(),
            content,
            created_at: Utc::now(),
            edited: false,
            reactions: Reactions::default(),
            attachments,
        }
    }

    /// Log and publish a failure, then hand it back for returning.
    fn fail(&self, err: DiscussionError) -> DiscussionError {
        if let Some(kind) = err.kind() {
            warn!("{}", err);
            self.notifier.alert(kind, err.to_string());
        }
        err
    }
}

fn non_blank(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::EmptyText.into());
    }
    Ok(text.to_string())
}

/// SHA-256 over forum, parent and content.
pub fn submission_key(forum_id: ForumId, parent: Option<i64>, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(forum_id.to_le_bytes());
    hasher.update(parent.unwrap_or(-1).to_le_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn entry_from(payload: MessagePayload, author: Author) -> Entry {
    let created_at = payload.created_at.unwrap_or_else(Utc::now);
    Entry {
        post: Post {
            id: MessageId::Server(payload.id),
            delivery: Delivery::Confirmed,
            author,
            content: payload.content,
            created_at,
            edited: is_edited(created_at, payload.updated_at),
            reactions: Reactions::default(),
            attachments: payload.attachments,
        },
        parent: payload.parent,
        pinned: payload.is_pinned,
    }
}

/// The server stamps `updated_at` on creation too, a hair after `created_at`.
fn is_edited(created_at: DateTime<Utc>, updated_at: Option<DateTime<Utc>>) -> bool {
    updated_at.is_some_and(|updated| updated - created_at > Duration::seconds(1))
}
