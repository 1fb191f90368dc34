use std::path::PathBuf;

use anyhow::{Context, Result};

use agora_api::client::DEFAULT_API_URL;
use agora_discussion::DiscussionConfig;
use agora_discussion::config::DEFAULT_PAGE_SIZE;

pub const DEFAULT_SESSION_PATH: &str = "agora-session.db";
pub const DEFAULT_LOG_FILTER: &str = "agora=info,agora_api=debug,agora_session=info,agora_discussion=debug";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_path: PathBuf,
    pub discussion: DiscussionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = var("AGORA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let session_path = var("AGORA_SESSION_PATH").unwrap_or_else(|| DEFAULT_SESSION_PATH.into());
        let page_size = match var("AGORA_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("AGORA_PAGE_SIZE must be a number, got {:?}", raw))?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            session_path: PathBuf::from(session_path),
            discussion: DiscussionConfig {
                page_size,
                sync_pins: flag(var("AGORA_SYNC_PINS"), false),
                resolve_authors: flag(var("AGORA_RESOLVE_AUTHORS"), true),
            },
        })
    }
}

fn flag(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
