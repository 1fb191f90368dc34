use std::sync::{Arc, RwLock};

use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use agora_types::api::Credentials;

use crate::error::ApiError;

/// Default API server URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP client for the forum REST API.
///
/// Every request carries the bearer access token and the CSRF header when
/// they are known. Cookies are kept so the CSRF cookie set by `/auth/csrf/`
/// travels with later requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Arc<RwLock<Credentials>>,
}

impl HttpClient {
    /// Creates a client for the default URL
    pub fn new() -> Result<Self, ApiError> {
        Self::with_url(DEFAULT_API_URL)
    }

    /// Creates a client for a custom URL
    pub fn with_url(url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: url.into().trim_end_matches('/').to_string(),
            credentials: Arc::new(RwLock::new(Credentials::default())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().unwrap_or_else(|e| e.into_inner()) = credentials;
    }

    /// Apply `f` to the stored credentials in place.
    pub fn update_credentials(&self, f: impl FnOnce(&mut Credentials)) {
        let mut guard = self.credentials.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with auth headers attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let credentials = self.credentials();
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");

        if let Some(csrf) = credentials.csrf_token {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        if let Some(token) = credentials.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Undecodable response body: {}", e);
            ApiError::InvalidResponse(e.to_string())
        })
    }

    /// Send and discard the body (DELETE and friends answer 204).
    pub(crate) async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check(builder.send().await?).await?;
        Ok(())
    }
}

/// Turn non-2xx responses into [`ApiError::Status`].
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = status.canonical_reason().unwrap_or("request failed").to_string();
    let body = response.text().await.unwrap_or_default();
    debug!("{} {} -> {}", status.as_u16(), reason, body);
    Err(ApiError::from_body(status.as_u16(), &reason, &body))
}
