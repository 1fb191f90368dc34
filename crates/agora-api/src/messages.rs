use reqwest::Method;
use tracing::{debug, info, instrument};

use agora_types::api::{
    CreateMessageRequest, MentionResponse, MessageFilter, MessagePayload, Paginated,
    UpdateMessageRequest,
};
use agora_types::models::Page;

use crate::client::HttpClient;
use crate::error::ApiError;

impl HttpClient {
    /// GET /api/messages/: top-level messages and replies come back in one list.
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Page<MessagePayload>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/messages/")
            .query(&filter.query_pairs());
        let raw: Paginated<MessagePayload> = self.send_json(builder).await?;
        let page: Page<MessagePayload> = raw.into();
        debug!(
            "Fetched {} messages (with user detail: {})",
            page.results.len(),
            page.results.iter().filter(|m| m.user_detail.is_some()).count()
        );
        Ok(page)
    }

    /// POST /api/messages/: a reply is a message with `parent` set.
    #[instrument(skip(self, req), fields(forum = req.forum, parent = ?req.parent))]
    pub async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> Result<MessagePayload, ApiError> {
        let builder = self.request(Method::POST, "/api/messages/").json(req);
        let message: MessagePayload = self.send_json(builder).await?;
        info!("Created message {} in forum {}", message.id, req.forum);
        Ok(message)
    }

    #[instrument(skip(self, req))]
    pub async fn update_message(
        &self,
        id: i64,
        req: &UpdateMessageRequest,
    ) -> Result<MessagePayload, ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("/api/messages/{}/", id))
            .json(req);
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    pub async fn delete_message(&self, id: i64) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("/api/messages/{}/", id));
        self.send_empty(builder).await?;
        info!("Deleted message {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_mentions(&self, message_id: i64) -> Result<Vec<MentionResponse>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/message-mentions/")
            .query(&[("message", message_id.to_string())]);
        let raw: Paginated<MentionResponse> = self.send_json(builder).await?;
        Ok(Page::from(raw).results)
    }
}
