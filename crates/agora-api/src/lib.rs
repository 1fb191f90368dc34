//! REST client for the forum API.
//!
//! [`HttpClient`] talks to the server over HTTP. The [`ForumBackend`] and
//! [`AuthBackend`] traits are the seams the rest of the workspace programs
//! against, so the discussion controller can run against any implementation.

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
pub mod forums;
pub mod messages;
pub mod users;

pub use backend::{AuthBackend, ForumBackend};
pub use client::HttpClient;
pub use error::ApiError;
