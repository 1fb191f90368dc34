use reqwest::Method;
use tracing::instrument;

use agora_types::api::UserDetail;
use agora_types::models::UserId;

use crate::client::HttpClient;
use crate::error::ApiError;

impl HttpClient {
    /// GET /api/users/{id}/. Not every deployment serves this route, so
    /// callers treat failures as "unknown user".
    #[instrument(skip(self))]
    pub async fn fetch_user(&self, id: UserId) -> Result<UserDetail, ApiError> {
        let builder = self.request(Method::GET, &format!("/api/users/{}/", id));
        let mut detail: UserDetail = self.send_json(builder).await?;
        detail.id.get_or_insert(id);
        Ok(detail)
    }
}
