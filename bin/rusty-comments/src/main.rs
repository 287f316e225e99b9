//! # rusty-comments Binary
//!
//! The entry point that assembles the content store from configuration and
//! the backends compiled in through features. The query layer receives the
//! resulting `StoreHandle`; this binary only opens it, optionally writes
//! demo content and reports what the store holds.

mod seed;

use anyhow::Context;
use rc_config::{LogSettings, Settings};
use rc_store::StoreHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (.env, config files, RC__* variables)
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);

    run(&settings).await?;
    Ok(())
}

/// Opens the configured store, writes demo content when asked and reports
/// what the store holds. Returns the number of posts.
async fn run(settings: &Settings) -> anyhow::Result<usize> {
    // 2. The single active backend for this process
    let store = StoreHandle::open(&settings.store)
        .await
        .context("failed to open content store")?;

    // 3. Optional demo content
    if settings.seed.posts > 0 {
        let summary = seed::populate(&*store, &settings.seed).await?;
        info!(
            posts = summary.posts,
            comments = summary.comments,
            replies = summary.replies,
            "demo content written"
        );
    }

    // 4. Report
    let posts = store.get_posts().await?;
    for post in &posts {
        let pages = store.get_number_of_comment_pages(&post.id).await?;
        info!(
            post_id = %post.id,
            top_level = post.comment_ids.len(),
            full_pages = pages,
            allow_comments = post.allow_comments,
            "post"
        );
    }
    info!(backend = store.backend_name(), posts = posts.len(), "content store ready");
    Ok(posts.len())
}
