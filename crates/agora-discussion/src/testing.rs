//! In-memory backend for controller tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use agora_api::{ApiError, AuthBackend, ForumBackend};
use agora_types::api::{
    AuthResponse, CreateForumRequest, CreateMessageRequest, ForumFilter, ForumResponse,
    LoginRequest, LogoutRequest, MembershipFilter, MembershipResponse, MentionResponse,
    MessageFilter, MessagePayload, RegisterRequest, TokenPair, UpdateForumRequest,
    UpdateMessageRequest, UserDetail, UserSummary,
};
use agora_types::models::{Category, ForumId, Page, Role, Tag, UserId};

pub const PASSWORD: &str = "secret";

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    forums: Vec<ForumResponse>,
    messages: Vec<MessagePayload>,
    users: HashMap<UserId, UserDetail>,
    memberships: Vec<MembershipResponse>,
    mentions: Vec<MentionResponse>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    next_id: i64,
    acting_user: UserId,
    access_token: Option<String>,
    envelope: bool,
    per_page: Option<usize>,
    failing_page: Option<u32>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minutes)
}

pub fn payload(id: i64, user: UserId, content: &str, parent: Option<i64>, minutes: i64) -> MessagePayload {
    MessagePayload {
        id,
        forum: Some(1),
        user: Some(user),
        content: content.to_string(),
        parent,
        created_at: Some(at(minutes)),
        ..Default::default()
    }
}

pub fn detail(id: UserId, username: &str, role: Role) -> UserDetail {
    UserDetail {
        id: Some(id),
        username: Some(username.to_string()),
        name: None,
        avatar: Some(format!("https://cdn.example/{}.png", username)),
        role: Some(role),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state();
            state.next_id = 100;
            state.acting_user = 1;
        }
        backend
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    pub fn with_forum(self, id: ForumId, creator: UserId, locked: bool) -> Self {
        self.state().forums.push(ForumResponse {
            id,
            name: format!("Forum {}", id),
            description: String::new(),
            category_detail: None,
            tags_detail: Vec::new(),
            created_by: Some(UserSummary {
                id: creator,
                email: None,
                name: None,
            }),
            is_locked: locked,
            messages_count: None,
            created_at: Some(at(0)),
        });
        self
    }

    pub fn with_message(self, message: MessagePayload) -> Self {
        self.state().messages.push(message);
        self
    }

    pub fn with_user(self, detail: UserDetail) -> Self {
        if let Some(id) = detail.id {
            self.state().users.insert(id, detail);
        }
        self
    }

    pub fn with_membership(self, id: i64, user: UserId, forum: ForumId) -> Self {
        self.state().memberships.push(MembershipResponse {
            id,
            user,
            forum,
            joined_at: None,
        });
        self
    }

    pub fn with_mention(self, message: i64, mentioned_user: UserId) -> Self {
        let mut state = self.state();
        let id = state.mentions.len() as i64 + 1;
        state.mentions.push(MentionResponse {
            id,
            message,
            mentioned_user,
        });
        drop(state);
        self
    }

    pub fn with_catalog(self, categories: Vec<Category>, tags: Vec<Tag>) -> Self {
        {
            let mut state = self.state();
            state.categories = categories;
            state.tags = tags;
        }
        self
    }

    /// Answer list calls with a paginated envelope instead of a bare array.
    pub fn paginated(self) -> Self {
        self.state().envelope = true;
        self
    }

    /// Split message lists into pages of `size`, linked with `next`.
    pub fn paged(self, size: usize) -> Self {
        {
            let mut state = self.state();
            state.per_page = Some(size.max(1));
            state.envelope = true;
        }
        self
    }

    /// Make the message list answer 500 for one page only.
    pub fn fail_page(&self, page: u32) {
        self.state().failing_page = Some(page);
    }

    pub fn acting_as(self, user: UserId) -> Self {
        self.state().acting_user = user;
        self
    }

    pub fn issue_token(self, token: &str) -> Self {
        self.state().access_token = Some(token.to_string());
        self
    }

    /// Make every call to `op` answer 500.
    pub fn fail(&self, op: &'static str) {
        self.state().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state().failing.remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn stored_messages(&self) -> usize {
        self.state().messages.len()
    }

    pub fn forum_locked(&self, id: ForumId) -> Option<bool> {
        self.state().forums.iter().find(|f| f.id == id).map(|f| f.is_locked)
    }

    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(op) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(state)
    }

    fn not_found() -> ApiError {
        ApiError::Status {
            status: 404,
            message: "Not found.".into(),
        }
    }
}

impl FakeState {
    fn page<T>(&self, results: Vec<T>) -> Page<T> {
        if self.envelope {
            Page {
                count: Some(results.len() as u64),
                results,
                next: None,
                previous: None,
            }
        } else {
            Page::from(results)
        }
    }

    fn message_page(&self, results: Vec<MessagePayload>, page: u32) -> Page<MessagePayload> {
        let Some(size) = self.per_page else {
            return self.page(results);
        };
        let count = results.len();
        let start = (page.max(1) as usize - 1) * size;
        let next = (start + size < count).then(|| format!("/api/messages/?page={}", page + 1));
        let previous = (page > 1).then(|| format!("/api/messages/?page={}", page - 1));
        Page {
            count: Some(count as u64),
            results: results.into_iter().skip(start).take(size).collect(),
            next,
            previous,
        }
    }

    fn auth_response(&self, id: UserId, email: &str, name: &str) -> AuthResponse {
        AuthResponse {
            id,
            email: email.to_string(),
            name: name.to_string(),
            tokens: TokenPair {
                access: self.access_token.clone().unwrap_or_else(|| "access-token".into()),
                refresh: "refresh-token".into(),
            },
        }
    }
}

impl ForumBackend for FakeBackend {
    async fn list_forums(&self, filter: &ForumFilter) -> Result<Page<ForumResponse>, ApiError> {
        let state = self.enter("list_forums")?;
        let forums = state
            .forums
            .iter()
            .filter(|f| filter.is_locked.is_none_or(|locked| f.is_locked == locked))
            .filter(|f| {
                filter
                    .user_id
                    .is_none_or(|user| f.created_by.as_ref().is_some_and(|c| c.id == user))
            })
            .cloned()
            .collect();
        Ok(state.page(forums))
    }

    async fn get_forum(&self, id: ForumId) -> Result<ForumResponse, ApiError> {
        let state = self.enter("get_forum")?;
        state.forums.iter().find(|f| f.id == id).cloned().ok_or_else(Self::not_found)
    }

    async fn create_forum(&self, req: &CreateForumRequest) -> Result<ForumResponse, ApiError> {
        let mut state = self.enter("create_forum")?;
        state.next_id += 1;
        let forum = ForumResponse {
            id: state.next_id,
            name: req.name.clone(),
            description: req.description.clone(),
            category_detail: state.categories.iter().find(|c| Some(c.id) == req.category).cloned(),
            tags_detail: state.tags.iter().filter(|t| req.tags.contains(&t.id)).cloned().collect(),
            created_by: Some(UserSummary {
                id: state.acting_user,
                email: None,
                name: None,
            }),
            is_locked: req.is_locked,
            messages_count: Some(0),
            created_at: Some(Utc::now()),
        };
        state.forums.push(forum.clone());
        Ok(forum)
    }

    async fn update_forum(
        &self,
        id: ForumId,
        req: &UpdateForumRequest,
    ) -> Result<ForumResponse, ApiError> {
        let mut state = self.enter("update_forum")?;
        let forum = state
            .forums
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(Self::not_found)?;
        if let Some(name) = &req.name {
            forum.name = name.clone();
        }
        if let Some(description) = &req.description {
            forum.description = description.clone();
        }
        if let Some(locked) = req.is_locked {
            forum.is_locked = locked;
        }
        Ok(forum.clone())
    }

    async fn delete_forum(&self, id: ForumId) -> Result<(), ApiError> {
        let mut state = self.enter("delete_forum")?;
        let before = state.forums.len();
        state.forums.retain(|f| f.id != id);
        if state.forums.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Ok(self.enter("list_categories")?.categories.clone())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        Ok(self.enter("list_tags")?.tags.clone())
    }

    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> Result<Page<MembershipResponse>, ApiError> {
        let state = self.enter("list_memberships")?;
        let memberships = state
            .memberships
            .iter()
            .filter(|m| filter.user_id.is_none_or(|u| m.user == u))
            .filter(|m| filter.forum_id.is_none_or(|f| m.forum == f))
            .cloned()
            .collect();
        Ok(state.page(memberships))
    }

    async fn join_forum(&self, forum: ForumId) -> Result<MembershipResponse, ApiError> {
        let mut state = self.enter("join_forum")?;
        state.next_id += 1;
        let membership = MembershipResponse {
            id: state.next_id,
            user: state.acting_user,
            forum,
            joined_at: Some(Utc::now()),
        };
        state.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn leave_forum(&self, membership_id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("leave_forum")?;
        state.memberships.retain(|m| m.id != membership_id);
        Ok(())
    }

    async fn list_messages(&self, filter: &MessageFilter) -> Result<Page<MessagePayload>, ApiError> {
        let state = self.enter("list_messages")?;
        let page = filter.page.unwrap_or(1);
        if state.failing_page == Some(page) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("page {} failed", page),
            });
        }
        let messages = state
            .messages
            .iter()
            .filter(|m| filter.forum_id.is_none_or(|f| m.forum == Some(f)))
            .filter(|m| filter.user_id.is_none_or(|u| m.user == Some(u)))
            .cloned()
            .collect();
        Ok(state.message_page(messages, page))
    }

    async fn create_message(&self, req: &CreateMessageRequest) -> Result<MessagePayload, ApiError> {
        let mut state = self.enter("create_message")?;
        state.next_id += 1;
        let user = state.acting_user;
        let message = MessagePayload {
            id: state.next_id,
            forum: Some(req.forum),
            user: Some(user),
            user_detail: state.users.get(&user).cloned(),
            content: req.content.clone(),
            parent: req.parent,
            created_at: Some(Utc::now()),
            attachments: req.attachments.clone(),
            ..Default::default()
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn update_message(
        &self,
        id: i64,
        req: &UpdateMessageRequest,
    ) -> Result<MessagePayload, ApiError> {
        let mut state = self.enter("update_message")?;
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(Self::not_found)?;
        if let Some(content) = &req.content {
            message.content = content.clone();
            message.updated_at = Some(Utc::now());
        }
        if let Some(pinned) = req.is_pinned {
            message.is_pinned = pinned;
        }
        Ok(message.clone())
    }

    async fn delete_message(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.enter("delete_message")?;
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id && m.parent != Some(id));
        if state.messages.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn list_mentions(&self, message_id: i64) -> Result<Vec<MentionResponse>, ApiError> {
        let state = self.enter("list_mentions")?;
        Ok(state
            .mentions
            .iter()
            .filter(|m| m.message == message_id)
            .cloned()
            .collect())
    }

    async fn fetch_user(&self, id: UserId) -> Result<UserDetail, ApiError> {
        let state = self.enter("fetch_user")?;
        state.users.get(&id).cloned().ok_or_else(Self::not_found)
    }
}

impl AuthBackend for FakeBackend {
    async fn fetch_csrf(&self) -> Result<String, ApiError> {
        let _state = self.enter("fetch_csrf")?;
        Ok("csrf-token".into())
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let state = self.enter("login")?;
        if req.password != PASSWORD {
            return Err(ApiError::Status {
                status: 401,
                message: "Invalid credentials".into(),
            });
        }
        let name = req.email.split('@').next().unwrap_or_default();
        Ok(state.auth_response(state.acting_user, &req.email, name))
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let mut state = self.enter("register")?;
        state.next_id += 1;
        let id = state.next_id;
        Ok(state.auth_response(id, &req.email, &req.name))
    }

    async fn logout(&self, _req: &LogoutRequest) -> Result<(), ApiError> {
        let _state = self.enter("logout")?;
        Ok(())
    }
}
