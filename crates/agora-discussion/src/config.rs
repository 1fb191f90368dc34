/// Knobs for a [`Discussion`](crate::Discussion) and the forum directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionConfig {
    /// Page size used for forum listings and total-page math
    pub page_size: u32,

    /// Send pin changes to the server. Off by default because the backend
    /// keeps no pin column; pins are then local to this session.
    pub sync_pins: bool,

    /// Fetch `/api/users/{id}/` for authors the payload and cache don't cover
    pub resolve_authors: bool,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            sync_pins: false,
            resolve_authors: true,
        }
    }
}
