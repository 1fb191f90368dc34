use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ForumId, MessageId, UserId};

/// Category of a user-visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Load,
    Send,
    Reply,
    Edit,
    Delete,
    Pin,
    Lock,
    Forum,
    Membership,
    Auth,
    Validation,
}

/// State transitions published by a discussion so a view can re-render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DiscussionEvent {
    /// The message list was (re)loaded
    Loaded { forum_id: ForumId, count: usize },

    /// An optimistic message was inserted
    MessagePending { local_id: Uuid },

    /// The server accepted an optimistic message
    MessageConfirmed { local_id: Uuid, id: i64 },

    /// The server rejected an optimistic message; it has been removed
    MessageFailed { local_id: Uuid, reason: String },

    ReplyPending { parent: i64, local_id: Uuid },

    ReplyConfirmed { parent: i64, local_id: Uuid, id: i64 },

    ReplyFailed { parent: i64, local_id: Uuid, reason: String },

    MessageEdited { id: i64 },

    MessageDeleted { id: i64 },

    PinChanged { id: MessageId, pinned: bool },

    ReactionToggled {
        target: MessageId,
        emoji: String,
        user_id: UserId,
        added: bool,
    },

    LockChanged { forum_id: ForumId, locked: bool },

    /// Ban list changed for a user
    BanChanged { user_id: UserId, banned: bool },

    /// Something went wrong and the user should be told
    Alert { kind: AlertKind, message: String },
}

impl DiscussionEvent {
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Alert { .. })
    }
}
