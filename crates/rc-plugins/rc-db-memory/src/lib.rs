//! # rc-db-memory
//!
//! Process-local implementation of `ContentStore`.
//! Posts and comments live in two maps keyed by id; each entity carries its
//! own ordered child-id list. Doubles as the reference for the contract's
//! observable behaviour.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rc_core::error::{EntityKind, Result, StoreError};
use rc_core::id::next_id;
use rc_core::models::{
    full_pages, normalize_parent_id, page_bounds, Comment, Post, DEFAULT_COMMENTS_PAGE_SIZE,
};
use rc_core::traits::{ContentStore, IdProbe};
use rc_core::validation::{validate_comment_content, validate_new_post};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct MemoryState {
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
    /// Post ids in creation order, so listing is stable.
    post_order: Vec<String>,
}

impl MemoryState {
    fn post(&self, id: &str) -> Result<&Post> {
        self.posts
            .get(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Post, id))
    }

    fn comment(&self, id: &str) -> Result<&Comment> {
        self.comments
            .get(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Comment, id))
    }

    fn resolve(&self, ids: &[String]) -> Vec<Comment> {
        ids.iter()
            .filter_map(|id| self.comments.get(id).cloned())
            .collect()
    }
}

#[async_trait]
impl IdProbe for MemoryState {
    async fn is_taken(&mut self, id: &str) -> Result<bool> {
        Ok(self.posts.contains_key(id) || self.comments.contains_key(id))
    }
}

/// In-memory content store.
///
/// A single lock guards both maps, so the read-validate-append sequence of
/// `add_comment` cannot interleave with another write.
#[derive(Debug)]
pub struct MemoryContentStore {
    state: RwLock<MemoryState>,
    page_size: usize,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_COMMENTS_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            page_size: page_size.max(1),
        }
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    #[instrument(skip(self, title, content))]
    async fn add_post(&self, title: &str, content: &str, allow_comments: bool) -> Result<Post> {
        validate_new_post(title, content)?;

        let mut state = self.state.write().await;
        let post = Post {
            id: next_id(&mut *state).await?,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            comment_ids: Vec::new(),
            allow_comments,
        };

        state.post_order.push(post.id.clone());
        state.posts.insert(post.id.clone(), post.clone());
        debug!(post_id = %post.id, "post created");
        Ok(post)
    }

    async fn get_posts(&self) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        Ok(state
            .post_order
            .iter()
            .filter_map(|id| state.posts.get(id).cloned())
            .collect())
    }

    async fn get_post_by_id(&self, id: &str) -> Result<Post> {
        self.state.read().await.post(id).cloned()
    }

    #[instrument(skip(self, content))]
    async fn add_comment(
        &self,
        post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<Comment> {
        let parent_comment_id = normalize_parent_id(parent_comment_id);
        let mut state = self.state.write().await;

        let post = state.post(post_id)?;
        if !post.allow_comments {
            return Err(StoreError::Forbidden(format!(
                "comments are not allowed for post {post_id}"
            )));
        }
        validate_comment_content(content)?;

        if let Some(parent_id) = parent_comment_id {
            let parent = state.comment(parent_id)?;
            if parent.post_id != post_id {
                return Err(StoreError::Validation(format!(
                    "parent comment {parent_id} belongs to a different post"
                )));
            }
        }

        let comment = Comment {
            id: next_id(&mut *state).await?,
            post_id: post_id.to_string(),
            parent_comment_id: parent_comment_id.map(str::to_string),
            content: content.to_string(),
            created_at: Utc::now(),
            reply_ids: Vec::new(),
        };

        // Parents were checked above under the same write lock.
        let siblings = match parent_comment_id {
            None => state.posts.get_mut(post_id).map(|p| &mut p.comment_ids),
            Some(parent_id) => state.comments.get_mut(parent_id).map(|c| &mut c.reply_ids),
        };
        if let Some(siblings) = siblings {
            siblings.push(comment.id.clone());
        }
        state.comments.insert(comment.id.clone(), comment.clone());

        debug!(comment_id = %comment.id, post_id, "comment created");
        Ok(comment)
    }

    async fn get_comments(&self, post_id: &str, page: u32) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let post = state.post(post_id)?;
        Ok(match page_bounds(post.comment_ids.len(), page, self.page_size) {
            Some((start, end)) => state.resolve(&post.comment_ids[start..end]),
            None => Vec::new(),
        })
    }

    async fn get_number_of_comment_pages(&self, post_id: &str) -> Result<usize> {
        let state = self.state.read().await;
        let post = state.post(post_id)?;
        Ok(full_pages(post.comment_ids.len(), self.page_size))
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment> {
        self.state.read().await.comment(id).cloned()
    }

    async fn get_replies(&self, comment_id: &str) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let comment = state.comment(comment_id)?;
        Ok(state.resolve(&comment.reply_ids))
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
