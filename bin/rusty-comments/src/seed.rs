//! Demo content for local runs.

use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use rc_config::SeedSettings;
use rc_core::models::{MAX_COMMENT_LENGTH, MAX_POST_CONTENT_LENGTH, MAX_POST_TITLE_LENGTH};
use rc_core::traits::ContentStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub posts: usize,
    pub comments: usize,
    pub replies: usize,
}

fn clip(text: String, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Writes `settings.posts` posts, each with `settings.comments_per_post`
/// top-level comments. Every third comment gets a reply, and every fifth post
/// is followed by an announcement that takes no comments.
pub async fn populate(
    store: &dyn ContentStore,
    settings: &SeedSettings,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for n in 0..settings.posts {
        let title = clip(Sentence(3..7).fake(), MAX_POST_TITLE_LENGTH);
        let body = clip(Paragraph(2..5).fake(), MAX_POST_CONTENT_LENGTH);
        let post = store.add_post(&title, &body, true).await?;
        summary.posts += 1;

        for i in 0..settings.comments_per_post {
            let text = clip(Sentence(4..12).fake(), MAX_COMMENT_LENGTH);
            let comment = store.add_comment(&post.id, None, &text).await?;
            summary.comments += 1;

            if i % 3 == 0 {
                let reply = clip(Sentence(2..8).fake(), MAX_COMMENT_LENGTH);
                store.add_comment(&post.id, Some(&comment.id), &reply).await?;
                summary.replies += 1;
            }
        }

        if n % 5 == 4 {
            // read-only announcement, comments switched off
            let title = clip(format!("Announcement: {title}"), MAX_POST_TITLE_LENGTH);
            store.add_post(&title, &body, false).await?;
            summary.posts += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_config::StoreSettings;
    use rc_store::StoreHandle;

    #[tokio::test]
    async fn test_populate_memory_store() {
        let store = StoreHandle::open(&StoreSettings::default()).await.unwrap();
        let settings = SeedSettings {
            posts: 5,
            comments_per_post: 4,
        };

        let summary = populate(&*store, &settings).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                posts: 6,
                comments: 20,
                replies: 10,
            }
        );

        let posts = store.get_posts().await.unwrap();
        assert_eq!(posts.len(), 6);
        assert_eq!(posts.iter().filter(|p| !p.allow_comments).count(), 1);
        for post in posts.iter().filter(|p| p.allow_comments) {
            assert_eq!(post.comment_ids.len(), 4);
            let first = store.get_comment_by_id(&post.comment_ids[0]).await.unwrap();
            assert_eq!(first.reply_ids.len(), 1);
        }
    }
}
