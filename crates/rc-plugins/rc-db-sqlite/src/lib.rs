//! # rc-db-sqlite
//!
//! SQLite implementation of `ContentStore`, backed by a `posts` table and a
//! `comments` table whose `parent_comment_id` points back into itself.
//!
//! Child lists are not stored as columns. `comment_ids` and `reply_ids` are
//! derived from `comments.post_id` / `comments.parent_comment_id` in insertion
//! (`rowid`) order, so inserting the comment row is the append.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rc_core::error::{EntityKind, Result, StoreError};
use rc_core::id::next_id;
use rc_core::models::{full_pages, normalize_parent_id, Comment, Post, DEFAULT_COMMENTS_PAGE_SIZE};
use rc_core::traits::{ContentStore, IdProbe};
use rc_core::validation::{validate_comment_content, validate_new_post};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id             TEXT PRIMARY KEY NOT NULL,
    title          TEXT NOT NULL,
    content        TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    allow_comments BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS comments (
    id                TEXT PRIMARY KEY NOT NULL,
    post_id           TEXT NOT NULL REFERENCES posts(id),
    parent_comment_id TEXT REFERENCES comments(id),
    content           TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, parent_comment_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_comment_id);
"#;

/// Connection settings for [`SqliteContentStore::connect`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// e.g. `sqlite:rusty_comments.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    pub acquire_timeout: Duration,
    pub page_size: usize,
    /// Create the tables if they are missing.
    pub bootstrap_schema: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            page_size: DEFAULT_COMMENTS_PAGE_SIZE,
            bootstrap_schema: true,
        }
    }
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    allow_comments: bool,
}

impl PostRow {
    fn into_post(self, comment_ids: Vec<String>) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            comment_ids,
            allow_comments: self.allow_comments,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: String,
    post_id: String,
    parent_comment_id: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
}

impl CommentRow {
    fn into_comment(self, reply_ids: Vec<String>) -> Comment {
        Comment {
            id: self.id,
            post_id: self.post_id,
            parent_comment_id: self.parent_comment_id,
            content: self.content,
            created_at: self.created_at,
            reply_ids,
        }
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

// Row helpers. All of them run on a connection the caller already holds,
// usually an open transaction, so one operation sees one snapshot.

async fn fetch_post(conn: &mut SqliteConnection, id: &str) -> Result<Option<PostRow>> {
    sqlx::query_as::<_, PostRow>(
        "SELECT id, title, content, created_at, allow_comments FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(StoreError::storage)
}

async fn fetch_comment(conn: &mut SqliteConnection, id: &str) -> Result<Option<CommentRow>> {
    sqlx::query_as::<_, CommentRow>(
        "SELECT id, post_id, parent_comment_id, content, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(StoreError::storage)
}

async fn top_level_ids(conn: &mut SqliteConnection, post_id: &str) -> Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT id FROM comments WHERE post_id = ? AND parent_comment_id IS NULL ORDER BY rowid",
    )
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(StoreError::storage)
}

async fn reply_ids(conn: &mut SqliteConnection, comment_id: &str) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT id FROM comments WHERE parent_comment_id = ? ORDER BY rowid")
        .bind(comment_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(StoreError::storage)
}

/// Bound parameters per `IN (...)` lookup, well under SQLite's variable limit.
const REPLY_LOOKUP_CHUNK: usize = 500;

/// Attaches `reply_ids` to every row with one grouped query per chunk.
async fn with_replies(conn: &mut SqliteConnection, rows: Vec<CommentRow>) -> Result<Vec<Comment>> {
    let mut by_parent: HashMap<String, Vec<String>> = HashMap::new();

    for chunk in rows.chunks(REPLY_LOOKUP_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT parent_comment_id, id FROM comments WHERE parent_comment_id IN (",
        );
        let mut ids = query.separated(", ");
        for row in chunk {
            ids.push_bind(row.id.clone());
        }
        ids.push_unseparated(") ORDER BY rowid");

        let links: Vec<(String, String)> = query
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(StoreError::storage)?;
        for (parent_id, reply_id) in links {
            by_parent.entry(parent_id).or_default().push(reply_id);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let replies = by_parent.remove(&row.id).unwrap_or_default();
            row.into_comment(replies)
        })
        .collect())
}

/// Id probe bound to the connection of an open write transaction.
struct TxProbe<'c>(&'c mut SqliteConnection);

#[async_trait]
impl IdProbe for TxProbe<'_> {
    async fn is_taken(&mut self, id: &str) -> Result<bool> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?) OR EXISTS(SELECT 1 FROM comments WHERE id = ?)",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *self.0)
        .await
        .map_err(StoreError::storage)?;
        Ok(taken != 0)
    }
}

/// SQLite-backed content store.
///
/// Writes are serialised through `write_gate` and run in a transaction: the
/// parent checks, the id probe and the single INSERT all see the same state.
pub struct SqliteContentStore {
    pool: SqlitePool,
    write_gate: Mutex<()>,
    page_size: usize,
}

impl SqliteContentStore {
    /// Opens (or creates) the database described by `options`.
    pub async fn connect(options: &SqliteOptions) -> Result<Self> {
        let in_memory = is_memory_url(&options.url);

        let mut connect = SqliteConnectOptions::from_str(&options.url)
            .map_err(StoreError::storage)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            connect = connect.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database: keep exactly one
        // and never recycle it.
        let pool_options = SqlitePoolOptions::new().acquire_timeout(options.acquire_timeout);
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(options.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(connect)
            .await
            .map_err(StoreError::storage)?;

        let store = Self {
            pool,
            write_gate: Mutex::new(()),
            page_size: options.page_size.max(1),
        };
        if options.bootstrap_schema {
            store.bootstrap_schema().await?;
        }

        info!(in_memory, page_size = store.page_size, "SQLite content store ready");
        Ok(store)
    }

    /// Private in-memory database with the schema in place.
    pub async fn open_in_memory(page_size: usize) -> Result<Self> {
        Self::connect(&SqliteOptions {
            page_size,
            ..SqliteOptions::default()
        })
        .await
    }

    /// Creates both tables and their indexes if they do not exist yet.
    pub async fn bootstrap_schema(&self) -> Result<()> {
        debug!("bootstrapping SQLite schema");
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(StoreError::storage)?;
        Ok(())
    }

    /// Closes the pool; later calls fail with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn require_post(conn: &mut SqliteConnection, id: &str) -> Result<PostRow> {
        fetch_post(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Post, id))
    }

    async fn require_comment(conn: &mut SqliteConnection, id: &str) -> Result<CommentRow> {
        fetch_comment(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Comment, id))
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    #[instrument(skip(self, title, content))]
    async fn add_post(&self, title: &str, content: &str, allow_comments: bool) -> Result<Post> {
        validate_new_post(title, content)?;

        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;

        let post = Post {
            id: next_id(&mut TxProbe(&mut *tx)).await?,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            comment_ids: Vec::new(),
            allow_comments,
        };

        sqlx::query(
            "INSERT INTO posts (id, title, content, created_at, allow_comments) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.allow_comments)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        tx.commit().await.map_err(StoreError::storage)?;
        debug!(post_id = %post.id, "post created");
        Ok(post)
    }

    async fn get_posts(&self) -> Result<Vec<Post>> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;

        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT id, title, content, created_at, allow_comments FROM posts ORDER BY rowid",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        let links: Vec<(String, String)> = sqlx::query_as(
            "SELECT post_id, id FROM comments WHERE parent_comment_id IS NULL ORDER BY rowid",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        tx.commit().await.map_err(StoreError::storage)?;

        let mut by_post: HashMap<String, Vec<String>> = HashMap::new();
        for (post_id, comment_id) in links {
            by_post.entry(post_id).or_default().push(comment_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ids = by_post.remove(&row.id).unwrap_or_default();
                row.into_post(ids)
            })
            .collect())
    }

    async fn get_post_by_id(&self, id: &str) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;
        let row = Self::require_post(&mut tx, id).await?;
        let ids = top_level_ids(&mut tx, id).await?;
        tx.commit().await.map_err(StoreError::storage)?;
        Ok(row.into_post(ids))
    }

    /// Parent checks happen inside the write transaction; the INSERT of the
    /// comment row is its last and only write.
    #[instrument(skip(self, content))]
    async fn add_comment(
        &self,
        post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<Comment> {
        let parent_comment_id = normalize_parent_id(parent_comment_id);

        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;

        let post = Self::require_post(&mut tx, post_id).await?;
        if !post.allow_comments {
            return Err(StoreError::Forbidden(format!(
                "comments are not allowed for post {post_id}"
            )));
        }
        validate_comment_content(content)?;

        if let Some(parent_id) = parent_comment_id {
            let parent = Self::require_comment(&mut tx, parent_id).await?;
            if parent.post_id != post_id {
                return Err(StoreError::Validation(format!(
                    "parent comment {parent_id} belongs to a different post"
                )));
            }
        }

        let comment = Comment {
            id: next_id(&mut TxProbe(&mut *tx)).await?,
            post_id: post_id.to_string(),
            parent_comment_id: parent_comment_id.map(str::to_string),
            content: content.to_string(),
            created_at: Utc::now(),
            reply_ids: Vec::new(),
        };

        sqlx::query(
            "INSERT INTO comments (id, post_id, parent_comment_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.parent_comment_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        tx.commit().await.map_err(StoreError::storage)?;
        debug!(comment_id = %comment.id, post_id, "comment created");
        Ok(comment)
    }

    async fn get_comments(&self, post_id: &str, page: u32) -> Result<Vec<Comment>> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;
        Self::require_post(&mut tx, post_id).await?;
        if page == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let offset = i64::from(page - 1).saturating_mul(limit);

        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, parent_comment_id, content, created_at FROM comments \
             WHERE post_id = ? AND parent_comment_id IS NULL ORDER BY rowid LIMIT ? OFFSET ?",
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        let comments = with_replies(&mut tx, rows).await?;
        tx.commit().await.map_err(StoreError::storage)?;
        Ok(comments)
    }

    async fn get_number_of_comment_pages(&self, post_id: &str) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;
        Self::require_post(&mut tx, post_id).await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = ? AND parent_comment_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        tx.commit().await.map_err(StoreError::storage)?;
        Ok(full_pages(usize::try_from(count).unwrap_or(0), self.page_size))
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;
        let row = Self::require_comment(&mut tx, id).await?;
        let replies = reply_ids(&mut tx, id).await?;
        tx.commit().await.map_err(StoreError::storage)?;
        Ok(row.into_comment(replies))
    }

    async fn get_replies(&self, comment_id: &str) -> Result<Vec<Comment>> {
        let mut tx = self.pool.begin().await.map_err(StoreError::storage)?;
        Self::require_comment(&mut tx, comment_id).await?;

        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, parent_comment_id, content, created_at FROM comments \
             WHERE parent_comment_id = ? ORDER BY rowid",
        )
        .bind(comment_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::storage)?;

        let replies = with_replies(&mut tx, rows).await?;
        tx.commit().await.map_err(StoreError::storage)?;
        Ok(replies)
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
