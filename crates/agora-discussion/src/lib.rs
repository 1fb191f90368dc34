//! Client-side state for forum discussions.
//!
//! [`Discussion`] owns the message list of one open forum and applies posts,
//! replies, edits, pins, reactions, locks and bans to it, reconciling each
//! with a [`ForumBackend`](agora_api::ForumBackend). [`ForumDirectory`] covers
//! the forum list and memberships, [`SessionManager`] the sign-in flows.
//! State changes are published as
//! [`DiscussionEvent`](agora_types::events::DiscussionEvent)s on a [`Notifier`].

pub mod attachment;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod forums;
pub mod mention;
pub mod notifier;
pub mod resolver;
pub mod state;

#[cfg(test)]
mod testing;

pub use auth::SessionManager;
pub use config::DiscussionConfig;
pub use controller::{Discussion, PendingPost};
pub use error::{AuthError, DiscussionError, Rejection, ValidationError};
pub use forums::{ForumDirectory, ForumListing, NewForum};
pub use notifier::Notifier;
pub use resolver::{MemoryResolver, UserResolver};
