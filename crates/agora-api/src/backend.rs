use std::future::Future;

use agora_types::api::{
    AuthResponse, CreateForumRequest, CreateMessageRequest, ForumFilter, ForumResponse,
    LoginRequest, LogoutRequest, MembershipFilter, MembershipResponse, MentionResponse,
    MessageFilter, MessagePayload, RegisterRequest, UpdateForumRequest, UpdateMessageRequest,
    UserDetail,
};
use agora_types::models::{Category, ForumId, Page, Tag, UserId};

use crate::client::HttpClient;
use crate::error::ApiError;

/// Forum, message and membership resources.
pub trait ForumBackend: Send + Sync {
    fn list_forums(
        &self,
        filter: &ForumFilter,
    ) -> impl Future<Output = Result<Page<ForumResponse>, ApiError>> + Send;

    fn get_forum(&self, id: ForumId) -> impl Future<Output = Result<ForumResponse, ApiError>> + Send;

    fn create_forum(
        &self,
        req: &CreateForumRequest,
    ) -> impl Future<Output = Result<ForumResponse, ApiError>> + Send;

    fn update_forum(
        &self,
        id: ForumId,
        req: &UpdateForumRequest,
    ) -> impl Future<Output = Result<ForumResponse, ApiError>> + Send;

    fn delete_forum(&self, id: ForumId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, ApiError>> + Send;

    fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>, ApiError>> + Send;

    fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> impl Future<Output = Result<Page<MembershipResponse>, ApiError>> + Send;

    fn join_forum(
        &self,
        forum: ForumId,
    ) -> impl Future<Output = Result<MembershipResponse, ApiError>> + Send;

    fn leave_forum(&self, membership_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_messages(
        &self,
        filter: &MessageFilter,
    ) -> impl Future<Output = Result<Page<MessagePayload>, ApiError>> + Send;

    fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> impl Future<Output = Result<MessagePayload, ApiError>> + Send;

    fn update_message(
        &self,
        id: i64,
        req: &UpdateMessageRequest,
    ) -> impl Future<Output = Result<MessagePayload, ApiError>> + Send;

    fn delete_message(&self, id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_mentions(
        &self,
        message_id: i64,
    ) -> impl Future<Output = Result<Vec<MentionResponse>, ApiError>> + Send;

    /// Best-effort author lookup.
    fn fetch_user(&self, id: UserId) -> impl Future<Output = Result<UserDetail, ApiError>> + Send;
}

/// Login, registration and CSRF bootstrap.
pub trait AuthBackend: Send + Sync {
    fn fetch_csrf(&self) -> impl Future<Output = Result<String, ApiError>> + Send;

    fn login(&self, req: &LoginRequest) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    fn register(
        &self,
        req: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    fn logout(&self, req: &LogoutRequest) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl ForumBackend for HttpClient {
    async fn list_forums(&self, filter: &ForumFilter) -> Result<Page<ForumResponse>, ApiError> {
        HttpClient::list_forums(self, filter).await
    }

    async fn get_forum(&self, id: ForumId) -> Result<ForumResponse, ApiError> {
        HttpClient::get_forum(self, id).await
    }

    async fn create_forum(&self, req: &CreateForumRequest) -> Result<ForumResponse, ApiError> {
        HttpClient::create_forum(self, req).await
    }

    async fn update_forum(
        &self,
        id: ForumId,
        req: &UpdateForumRequest,
    ) -> Result<ForumResponse, ApiError> {
        HttpClient::update_forum(self, id, req).await
    }

    async fn delete_forum(&self, id: ForumId) -> Result<(), ApiError> {
        HttpClient::delete_forum(self, id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        HttpClient::list_categories(self).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        HttpClient::list_tags(self).await
    }

    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> Result<Page<MembershipResponse>, ApiError> {
        HttpClient::list_memberships(self, filter).await
    }

    async fn join_forum(&self, forum: ForumId) -> Result<MembershipResponse, ApiError> {
        HttpClient::join_forum(self, forum).await
    }

    async fn leave_forum(&self, membership_id: i64) -> Result<(), ApiError> {
        HttpClient::leave_forum(self, membership_id).await
    }

    async fn list_messages(&self, filter: &MessageFilter) -> Result<Page<MessagePayload>, ApiError> {
        HttpClient::list_messages(self, filter).await
    }

    async fn create_message(&self, req: &CreateMessageRequest) -> Result<MessagePayload, ApiError> {
        HttpClient::create_message(self, req).await
    }

    async fn update_message(
        &self,
        id: i64,
        req: &UpdateMessageRequest,
    ) -> Result<MessagePayload, ApiError> {
        HttpClient::update_message(self, id, req).await
    }

    async fn delete_message(&self, id: i64) -> Result<(), ApiError> {
        HttpClient::delete_message(self, id).await
    }

    async fn list_mentions(&self, message_id: i64) -> Result<Vec<MentionResponse>, ApiError> {
        HttpClient::list_mentions(self, message_id).await
    }

    async fn fetch_user(&self, id: UserId) -> Result<UserDetail, ApiError> {
        HttpClient::fetch_user(self, id).await
    }
}

impl AuthBackend for HttpClient {
    async fn fetch_csrf(&self) -> Result<String, ApiError> {
        HttpClient::fetch_csrf(self).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        HttpClient::login(self, req).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        HttpClient::register(self, req).await
    }

    async fn logout(&self, req: &LogoutRequest) -> Result<(), ApiError> {
        HttpClient::logout(self, req).await
    }
}
