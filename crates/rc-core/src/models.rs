//! # Domain Models
//!
//! Snapshots of the two entities the store owns. Callers only ever hold
//! copies; mutation happens inside a backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on a post title, in characters.
pub const MAX_POST_TITLE_LENGTH: usize = 100;
/// Upper bound on a post body, in characters.
pub const MAX_POST_CONTENT_LENGTH: usize = 10_000;
/// Upper bound on a comment body, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2_000;
/// Top-level comments per page unless a store is configured otherwise.
pub const DEFAULT_COMMENTS_PAGE_SIZE: usize = 10;

/// A top-level discussion topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Top-level comment ids, oldest first. Append-only.
    pub comment_ids: Vec<String>,
    /// When false, nothing may be attached anywhere under this post.
    pub allow_comments: bool,
}

/// A comment on a post, or a reply nested under another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    /// `None` for a top-level comment attached directly to the post.
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Direct replies, oldest first. Append-only.
    pub reply_ids: Vec<String>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}

/// Treats an empty parent id the same as an absent one.
pub fn normalize_parent_id(parent_comment_id: Option<&str>) -> Option<&str> {
    parent_comment_id.filter(|id| !id.is_empty())
}

/// Returns the `[start, end)` window of the 1-indexed `page`, or `None` when
/// the page lies past the end of `len` items.
pub fn page_bounds(len: usize, page: u32, page_size: usize) -> Option<(usize, usize)> {
    if page == 0 || page_size == 0 {
        return None;
    }
    let start = (page as usize - 1).checked_mul(page_size)?;
    if start >= len {
        return None;
    }
    Some((start, start.saturating_add(page_size).min(len)))
}

/// Full pages only: a partially filled final page is not counted.
pub fn full_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count / page_size
}
