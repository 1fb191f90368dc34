use reqwest::Method;
use tracing::{info, instrument, warn};

use agora_types::api::{AuthResponse, CsrfResponse, LoginRequest, LogoutRequest, RegisterRequest};

use crate::client::HttpClient;
use crate::error::ApiError;

impl HttpClient {
    /// GET /auth/csrf/ and keep the token for later requests.
    #[instrument(skip(self))]
    pub async fn fetch_csrf(&self) -> Result<String, ApiError> {
        let builder = self.request(Method::GET, "/auth/csrf/");
        let resp: CsrfResponse = self.send_json(builder).await?;
        let token = resp.csrf_token;
        self.update_credentials(|c| c.csrf_token = Some(token.clone()));
        Ok(token)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let builder = self.request(Method::POST, "/auth/login").json(req);
        let resp: AuthResponse = self.send_json(builder).await?;
        self.adopt_tokens(&resp);
        info!("Signed in as user {}", resp.id);
        Ok(resp)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        // Validate input
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: "email and password are required".into(),
            });
        }

        let builder = self.request(Method::POST, "/auth/register").json(req);
        let resp: AuthResponse = self.send_json(builder).await?;
        self.adopt_tokens(&resp);
        info!("Registered user {}", resp.id);
        Ok(resp)
    }

    /// POST /auth/logout to blacklist the refresh token. Local tokens are
    /// dropped even when the server call fails.
    #[instrument(skip(self, req))]
    pub async fn logout(&self, req: &LogoutRequest) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, "/auth/logout").json(req);
        let result = self.send_empty(builder).await;
        if let Err(e) = &result {
            warn!("Logout request failed: {}", e);
        }
        self.update_credentials(|c| {
            c.access_token = None;
            c.refresh_token = None;
        });
        result
    }

    fn adopt_tokens(&self, resp: &AuthResponse) {
        let access = resp.tokens.access.clone();
        let refresh = resp.tokens.refresh.clone();
        self.update_credentials(|c| {
            c.access_token = Some(access);
            c.refresh_token = Some(refresh);
        });
    }
}
