use agora_api::ApiError;
use agora_types::events::AlertKind;

/// A handler refused to act. Nothing was changed and nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("message text is empty")]
    EmptyText,

    #[error("this discussion is locked")]
    Locked,

    #[error("you are not allowed to do that")]
    NotPermitted,

    #[error("message not found")]
    UnknownMessage,

    #[error("message has not been confirmed by the server yet")]
    NotConfirmed,

    #[error("an identical message is already being sent")]
    DuplicateSubmission,

    #[error("no forum is open")]
    NotLoaded,

    #[error("you are not a member of this forum")]
    NotMember,
}

/// Client-side attachment checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name}: only PDF, JPG, PNG and ZIP files are allowed")]
    UnsupportedType { name: String },

    #[error("{name} is too big ({size} bytes); the maximum is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(ApiError),

    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("not signed in")]
    SignedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscussionError {
    #[error("failed to load: {0}")]
    Load(ApiError),

    #[error("failed to send message: {0}")]
    Send(ApiError),

    #[error("failed to send reply: {0}")]
    Reply(ApiError),

    #[error("failed to edit message: {0}")]
    Edit(ApiError),

    #[error("failed to delete: {0}")]
    Delete(ApiError),

    #[error("failed to update pin: {0}")]
    Pin(ApiError),

    #[error("failed to change lock: {0}")]
    Lock(ApiError),

    #[error("forum request failed: {0}")]
    Forum(ApiError),

    #[error("membership change failed: {0}")]
    Membership(ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("session store error: {0}")]
    Session(#[from] anyhow::Error),
}

impl DiscussionError {
    /// Alert category shown to the user. Rejections are silent no-ops.
    pub fn kind(&self) -> Option<AlertKind> {
        match self {
            DiscussionError::Load(_) => Some(AlertKind::Load),
            DiscussionError::Send(_) => Some(AlertKind::Send),
            DiscussionError::Reply(_) => Some(AlertKind::Reply),
            DiscussionError::Edit(_) => Some(AlertKind::Edit),
            DiscussionError::Delete(_) => Some(AlertKind::Delete),
            DiscussionError::Pin(_) => Some(AlertKind::Pin),
            DiscussionError::Lock(_) => Some(AlertKind::Lock),
            DiscussionError::Forum(_) => Some(AlertKind::Forum),
            DiscussionError::Membership(_) => Some(AlertKind::Membership),
            DiscussionError::Auth(_) => Some(AlertKind::Auth),
            DiscussionError::Validation(_) => Some(AlertKind::Validation),
            DiscussionError::Session(_) => Some(AlertKind::Load),
            DiscussionError::Rejected(_) => None,
        }
    }

    /// The underlying API failure, if this came from the server.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DiscussionError::Load(e)
            | DiscussionError::Send(e)
            | DiscussionError::Reply(e)
            | DiscussionError::Edit(e)
            | DiscussionError::Delete(e)
            | DiscussionError::Pin(e)
            | DiscussionError::Lock(e)
            | DiscussionError::Forum(e)
            | DiscussionError::Membership(e) => Some(e),
            DiscussionError::Auth(AuthError::Rejected(e)) => Some(e),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            DiscussionError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscussionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_raise_no_alert() {
        let err = DiscussionError::from(Rejection::Locked);
        assert_eq!(err.kind(), None);
        assert_eq!(err.rejection(), Some(&Rejection::Locked));
    }

    #[test]
    fn api_failures_map_to_their_alert() {
        let err = DiscussionError::Send(ApiError::Unauthenticated);
        assert_eq!(err.kind(), Some(AlertKind::Send));
        assert!(err.api_error().is_some_and(ApiError::is_auth));

        let err = DiscussionError::from(ValidationError::UnsupportedType { name: "a.exe".into() });
        assert_eq!(err.kind(), Some(AlertKind::Validation));
        assert_eq!(err.to_string(), "a.exe: only PDF, JPG, PNG and ZIP files are allowed");
    }
}
