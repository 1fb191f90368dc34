use agora_types::api::ErrorBody;

/// Error type for API client operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("not signed in")]
    Unauthenticated,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server refused the credentials rather than the request.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthenticated) || matches!(self.status(), Some(401 | 403))
    }

    /// Build a status error from a non-2xx body. The message is taken from
    /// `detail`, then `error`, then the raw body, then the reason phrase.
    pub fn from_body(status: u16, reason: &str, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .detail
            .or(parsed.error)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| reason.to_string());
        ApiError::Status { status, message }
    }
}
