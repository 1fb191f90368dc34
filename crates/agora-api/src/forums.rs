use reqwest::Method;
use tracing::{info, instrument};

use agora_types::api::{
    CreateForumRequest, ForumFilter, ForumResponse, JoinForumRequest, MembershipFilter,
    MembershipResponse, Paginated, UpdateForumRequest,
};
use agora_types::models::{Category, ForumId, Page, Tag};

use crate::client::HttpClient;
use crate::error::ApiError;

impl HttpClient {
    /// GET /api/forums/ with filters and pagination.
    #[instrument(skip(self))]
    pub async fn list_forums(&self, filter: &ForumFilter) -> Result<Page<ForumResponse>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/forums/")
            .query(&filter.query_pairs());
        let raw: Paginated<ForumResponse> = self.send_json(builder).await?;
        Ok(raw.into())
    }

    #[instrument(skip(self))]
    pub async fn get_forum(&self, id: ForumId) -> Result<ForumResponse, ApiError> {
        let builder = self.request(Method::GET, &format!("/api/forums/{}/", id));
        self.send_json(builder).await
    }

    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_forum(&self, req: &CreateForumRequest) -> Result<ForumResponse, ApiError> {
        let builder = self.request(Method::POST, "/api/forums/").json(req);
        let forum: ForumResponse = self.send_json(builder).await?;
        info!("Created forum {} ({})", forum.name, forum.id);
        Ok(forum)
    }

    #[instrument(skip(self))]
    pub async fn update_forum(
        &self,
        id: ForumId,
        req: &UpdateForumRequest,
    ) -> Result<ForumResponse, ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("/api/forums/{}/", id))
            .json(req);
        self.send_json(builder).await
    }

    /// The server only marks the forum deleted; it disappears from listings.
    #[instrument(skip(self))]
    pub async fn delete_forum(&self, id: ForumId) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("/api/forums/{}/", id));
        self.send_empty(builder).await?;
        info!("Deleted forum {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let builder = self.request(Method::GET, "/api/categories/");
        let raw: Paginated<Category> = self.send_json(builder).await?;
        Ok(Page::from(raw).results)
    }

    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let builder = self.request(Method::GET, "/api/tags/");
        let raw: Paginated<Tag> = self.send_json(builder).await?;
        Ok(Page::from(raw).results)
    }

    // -- Memberships --

    #[instrument(skip(self))]
    pub async fn list_memberships(
        &self,
        filter: &MembershipFilter,
    ) -> Result<Page<MembershipResponse>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/forum-memberships/")
            .query(&filter.query_pairs());
        let raw: Paginated<MembershipResponse> = self.send_json(builder).await?;
        Ok(raw.into())
    }

    #[instrument(skip(self))]
    pub async fn join_forum(&self, forum: ForumId) -> Result<MembershipResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/api/forum-memberships/")
            .json(&JoinForumRequest { forum });
        let membership: MembershipResponse = self.send_json(builder).await?;
        info!("Joined forum {} (membership {})", forum, membership.id);
        Ok(membership)
    }

    #[instrument(skip(self))]
    pub async fn leave_forum(&self, membership_id: i64) -> Result<(), ApiError> {
        let builder = self.request(
            Method::DELETE,
            &format!("/api/forum-memberships/{}/", membership_id),
        );
        self.send_empty(builder).await
    }
}
