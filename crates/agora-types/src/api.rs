use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Attachment, Author, Category, Forum, ForumId, Membership, Page, Role, Tag, UserId,
    default_avatar,
};

// -- Auth --

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

/// Tokens attached to outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub csrf_token: Option<String>,
}

/// Claims read out of the access token. Only what the client needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// The `user` profile kept in the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl SessionUser {
    pub fn as_author(&self) -> Author {
        Author {
            id: self.id,
            name: self.name.clone(),
            avatar: self
                .avatar
                .clone()
                .unwrap_or_else(|| default_avatar(&self.name)),
            role: self.role,
        }
    }
}

impl From<&AuthResponse> for SessionUser {
    fn from(resp: &AuthResponse) -> Self {
        let name = if resp.name.is_empty() {
            format!("User {}", resp.id)
        } else {
            resp.name.clone()
        };
        Self {
            id: resp.id,
            email: resp.email.clone(),
            name,
            avatar: None,
            role: Role::User,
        }
    }
}

/// Error body returned by the API. Django REST framework uses `detail`, the
/// auth views use `error`, and validation failures are a field map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<String>,
    pub error: Option<String>,
}

// -- Lists --

/// Raw list response before normalisation into [`Page`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Paginated<T> {
    Envelope {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> From<Paginated<T>> for Page<T> {
    fn from(raw: Paginated<T>) -> Self {
        match raw {
            Paginated::Envelope {
                count,
                next,
                previous,
                results,
            } => Page {
                results,
                count,
                next,
                previous,
            },
            Paginated::Bare(results) => Page::from(results),
        }
    }
}

// -- Users --

/// User detail as embedded in message payloads or served by `/api/users/{id}/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDetail {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserDetail {
    /// Project onto an [`Author`], filling gaps the way the forum UI does.
    pub fn into_author(self, fallback_id: UserId) -> Author {
        let id = self.id.unwrap_or(fallback_id);
        let name = self
            .username
            .filter(|n| !n.is_empty())
            .or(self.name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| format!("User {}", id));
        let avatar = self
            .avatar
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| default_avatar(&format!("User {}", id)));
        Author {
            id,
            name,
            avatar,
            role: self.role.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// -- Forums --

#[derive(Debug, Clone, Deserialize)]
pub struct ForumResponse {
    pub id: ForumId,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_detail: Option<Category>,
    #[serde(default)]
    pub tags_detail: Vec<Tag>,
    #[serde(default)]
    pub created_by: Option<UserSummary>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub messages_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ForumResponse> for Forum {
    fn from(resp: ForumResponse) -> Self {
        Forum {
            id: resp.id,
            name: resp.name,
            description: resp.description,
            category: resp.category_detail,
            tags: resp.tags_detail,
            created_by: resp.created_by.map(|u| u.id),
            locked: resp.is_locked,
            message_count: resp.messages_count,
            created_at: resp.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateForumRequest {
    pub name: String,
    pub description: String,
    pub category: Option<i64>,
    pub tags: Vec<i64>,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateForumRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ForumFilter {
    pub category_id: Option<i64>,
    pub user_id: Option<UserId>,
    pub tag_ids: Vec<i64>,
    pub is_locked: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ForumFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.category_id {
            pairs.push(("category_id", id.to_string()));
        }
        if let Some(id) = self.user_id {
            pairs.push(("user_id", id.to_string()));
        }
        for tag in &self.tag_ids {
            pairs.push(("tags_id", tag.to_string()));
        }
        if let Some(locked) = self.is_locked {
            pairs.push(("is_locked", locked.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size", size.to_string()));
        }
        pairs
    }
}

// -- Memberships --

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipResponse {
    pub id: i64,
    pub user: UserId,
    pub forum: ForumId,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl From<MembershipResponse> for Membership {
    fn from(resp: MembershipResponse) -> Self {
        Membership {
            id: resp.id,
            user: resp.user,
            forum: resp.forum,
            joined_at: resp.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinForumRequest {
    pub forum: ForumId,
}

#[derive(Debug, Clone, Default)]
pub struct MembershipFilter {
    pub user_id: Option<UserId>,
    pub forum_id: Option<ForumId>,
}

impl MembershipFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.user_id {
            pairs.push(("user_id", id.to_string()));
        }
        if let Some(id) = self.forum_id {
            pairs.push(("forum_id", id.to_string()));
        }
        pairs
    }
}

// -- Messages --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    #[serde(default)]
    pub forum: Option<ForumId>,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub user_detail: Option<UserDetail>,
    #[serde(default)]
    pub author: Option<UserDetail>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessagePayload {
    /// Author information embedded in the payload, if any.
    pub fn take_author_detail(&mut self) -> Option<UserDetail> {
        self.user_detail.take().or_else(|| self.author.take())
    }

    /// The author's id, from the `user` field or embedded detail.
    pub fn author_id(&self) -> Option<UserId> {
        self.user
            .or_else(|| self.user_detail.as_ref().and_then(|d| d.id))
            .or_else(|| self.author.as_ref().and_then(|d| d.id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub forum: ForumId,
    pub parent: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub forum_id: Option<ForumId>,
    pub user_id: Option<UserId>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl MessageFilter {
    pub fn for_forum(forum_id: ForumId) -> Self {
        Self {
            forum_id: Some(forum_id),
            ..Self::default()
        }
    }

    /// The messages endpoint filters on `forum` and `user`, not `*_id`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.forum_id {
            pairs.push(("forum", id.to_string()));
        }
        if let Some(id) = self.user_id {
            pairs.push(("user", id.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size", size.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionResponse {
    pub id: i64,
    pub message: i64,
    pub mentioned_user: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_and_envelope_both_normalise() {
        let bare: Paginated<ForumResponse> =
            serde_json::from_str(r#"[{"id": 1, "name": "Rust"}]"#).unwrap();
        let page: Page<ForumResponse> = bare.into();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.count, None);

        let envelope: Paginated<ForumResponse> = serde_json::from_str(
            r#"{"count": 12, "next": "http://x/?page=2", "previous": null,
                "results": [{"id": 1, "name": "Rust", "is_locked": true}]}"#,
        )
        .unwrap();
        let page: Page<ForumResponse> = envelope.into();
        assert_eq!(page.count, Some(12));
        assert_eq!(page.total_pages(10), 2);
        assert!(page.results[0].is_locked);
    }

    #[test]
    fn forum_response_maps_nested_details() {
        let resp: ForumResponse = serde_json::from_str(
            r#"{"id": 3, "title": "Help", "description": "d",
                "category_detail": {"id": 2, "name": "Web"},
                "tags_detail": [{"id": 9, "name": "react"}],
                "created_by": {"id": 5, "email": "a@b.c", "name": "Ali"}}"#,
        )
        .unwrap();
        let forum = Forum::from(resp);
        assert_eq!(forum.name, "Help");
        assert_eq!(forum.created_by, Some(5));
        assert_eq!(forum.category.unwrap().name, "Web");
        assert_eq!(forum.tags.len(), 1);
        assert!(!forum.locked);
    }

    #[test]
    fn user_detail_falls_back_to_placeholder_fields() {
        let detail = UserDetail {
            name: Some("sara_dev".into()),
            role: Some(Role::Moderator),
            ..UserDetail::default()
        };
        let author = detail.into_author(2);
        assert_eq!(author.id, 2);
        assert_eq!(author.name, "sara_dev");
        assert_eq!(author.avatar, "https://ui-avatars.com/api/?name=User+2");
        assert!(author.role.can_moderate());

        let author = UserDetail::default().into_author(9);
        assert_eq!(author.name, "User 9");
    }

    #[test]
    fn message_filter_uses_short_keys() {
        let filter = MessageFilter {
            forum_id: Some(4),
            user_id: Some(1),
            ..MessageFilter::default()
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("forum", "4".to_string()), ("user", "1".to_string())]
        );
    }

    #[test]
    fn forum_filter_repeats_tags() {
        let filter = ForumFilter {
            tag_ids: vec![1, 2],
            page: Some(3),
            ..ForumFilter::default()
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("tags_id", "1".to_string()),
                ("tags_id", "2".to_string()),
                ("page", "3".to_string()),
            ]
        );
    }

    #[test]
    fn update_message_skips_unset_fields() {
        let req = UpdateMessageRequest {
            content: Some("fixed".into()),
            ..UpdateMessageRequest::default()
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"content":"fixed"}"#);
    }
}
