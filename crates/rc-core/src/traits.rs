//! # Core Traits (Ports)
//!
//! Any backend must implement these traits to be selected by the store handle.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Comment, Post};

/// Data persistence contract for posts and their comment trees.
///
/// Every call is atomic from the caller's point of view: a failed call leaves
/// no visible trace, and a successful write is fully linked into its parent
/// before any reader can see it.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Post Operations
    async fn add_post(&self, title: &str, content: &str, allow_comments: bool) -> Result<Post>;
    async fn get_posts(&self) -> Result<Vec<Post>>;
    async fn get_post_by_id(&self, id: &str) -> Result<Post>;

    // Comment Operations

    /// Attaches a comment to a post (`parent_comment_id` absent or empty) or
    /// to another comment of the same post.
    async fn add_comment(
        &self,
        post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<Comment>;

    /// Returns the 1-indexed `page` of the post's top-level comments.
    /// Pages past the end are empty rather than an error.
    async fn get_comments(&self, post_id: &str, page: u32) -> Result<Vec<Comment>>;

    /// Number of *full* pages of top-level comments.
    async fn get_number_of_comment_pages(&self, post_id: &str) -> Result<usize>;

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment>;

    /// All direct replies to a comment. Not paginated.
    async fn get_replies(&self, comment_id: &str) -> Result<Vec<Comment>>;

    fn page_size(&self) -> usize;

    /// Short name used in logs ("memory", "sqlite").
    fn backend_name(&self) -> &'static str;
}

/// Answers whether an identifier is already used by a post or a comment.
///
/// Backends implement this on whatever they hold while writing (locked state,
/// an open transaction) so the probe and the insert share one exclusion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdProbe: Send {
    async fn is_taken(&mut self, id: &str) -> Result<bool>;
}
