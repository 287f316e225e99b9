//! Behaviour every `ContentStore` backend must share.
//!
//! Each function receives a fresh, empty store.

use std::collections::HashSet;

use rc_core::error::{EntityKind, StoreError};
use rc_core::models::Comment;
use rc_store::StoreHandle;

fn ids(comments: &[Comment]) -> Vec<String> {
    comments.iter().map(|c| c.id.clone()).collect()
}

pub async fn add_post_returns_inputs(store: StoreHandle) {
    let post = store.add_post("Test Title", "Test Content", true).await.unwrap();
    assert_eq!(post.title, "Test Title");
    assert_eq!(post.content, "Test Content");
    assert!(post.allow_comments);
    assert!(post.comment_ids.is_empty());

    let locked = store.add_post("Locked", "No replies", false).await.unwrap();
    assert!(!locked.allow_comments);
    assert_ne!(post.id, locked.id);

    let fetched = store.get_post_by_id(&post.id).await.unwrap();
    assert_eq!(fetched.id, post.id);
    assert_eq!(fetched.title, post.title);
    assert_eq!(fetched.content, post.content);

    let listed: Vec<String> = store.get_posts().await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&post.id) && listed.contains(&locked.id));
}

pub async fn add_post_rejects_invalid_fields(store: StoreHandle) {
    let long_title = "t".repeat(101);
    let long_content = "c".repeat(10_001);
    let cases = [
        ("", "x"),
        ("x", ""),
        (long_title.as_str(), "x"),
        ("x", long_content.as_str()),
    ];
    for (title, content) in cases {
        let err = store.add_post(title, content, true).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)), "{err}");
    }
    assert!(store.get_posts().await.unwrap().is_empty());

    // exactly at the limits is fine
    store
        .add_post(&"t".repeat(100), &"c".repeat(10_000), true)
        .await
        .unwrap();
}

pub async fn top_level_comment_is_listed(store: StoreHandle) {
    let post = store.add_post("t", "c", true).await.unwrap();
    let comment = store.add_comment(&post.id, Some(""), "hello").await.unwrap();

    assert_eq!(comment.post_id, post.id);
    assert!(comment.is_top_level());
    assert!(comment.reply_ids.is_empty());

    let page = store.get_comments(&post.id, 1).await.unwrap();
    assert_eq!(ids(&page), vec![comment.id.clone()]);

    let fetched = store.get_comment_by_id(&comment.id).await.unwrap();
    assert_eq!(fetched.content, "hello");
    assert_eq!(fetched.parent_comment_id, None);

    let post = store.get_post_by_id(&post.id).await.unwrap();
    assert_eq!(post.comment_ids, vec![comment.id]);
}

pub async fn comment_content_is_validated(store: StoreHandle) {
    let post = store.add_post("t", "c", true).await.unwrap();

    for content in [String::new(), "x".repeat(2_001)] {
        let err = store.add_comment(&post.id, None, &content).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)), "{err}");
    }
    store.add_comment(&post.id, None, &"x".repeat(2_000)).await.unwrap();
    assert_eq!(store.get_post_by_id(&post.id).await.unwrap().comment_ids.len(), 1);
}

pub async fn locked_post_forbids_comments(store: StoreHandle) {
    let post = store.add_post("Locked", "Read only", false).await.unwrap();

    for content in ["perfectly fine", ""] {
        let err = store.add_comment(&post.id, None, content).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)), "{err}");
    }
    let err = store
        .add_comment(&post.id, Some("some-parent"), "reply")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Forbidden(_)), "{err}");

    assert!(store.get_post_by_id(&post.id).await.unwrap().comment_ids.is_empty());
}

pub async fn parent_from_other_post_is_rejected(store: StoreHandle) {
    let a = store.add_post("A", "first", true).await.unwrap();
    let b = store.add_post("B", "second", true).await.unwrap();
    let c1 = store.add_comment(&a.id, None, "on A").await.unwrap();

    let err = store.add_comment(&b.id, Some(&c1.id), "reply").await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)), "{err}");

    assert!(store.get_replies(&c1.id).await.unwrap().is_empty());
    assert!(store.get_post_by_id(&b.id).await.unwrap().comment_ids.is_empty());
}

pub async fn pagination_counts_full_pages(store: StoreHandle) {
    let page_size = store.page_size();
    let post = store.add_post("t", "c", true).await.unwrap();

    let mut created = Vec::new();
    for i in 0..3 * page_size {
        created.push(store.add_comment(&post.id, None, &format!("comment {i}")).await.unwrap().id);
    }

    assert_eq!(store.get_number_of_comment_pages(&post.id).await.unwrap(), 3);
    assert!(store.get_comments(&post.id, 4).await.unwrap().is_empty());
    assert!(store.get_comments(&post.id, 0).await.unwrap().is_empty());

    for page in 1..=3u32 {
        let start = (page as usize - 1) * page_size;
        let got = store.get_comments(&post.id, page).await.unwrap();
        assert_eq!(ids(&got), created[start..start + page_size].to_vec());
    }

    // one more comment starts a fourth page that is not counted
    let extra = store.add_comment(&post.id, None, "straggler").await.unwrap();
    assert_eq!(store.get_number_of_comment_pages(&post.id).await.unwrap(), 3);
    assert_eq!(ids(&store.get_comments(&post.id, 4).await.unwrap()), vec![extra.id]);
}

pub async fn replies_stay_out_of_top_level(store: StoreHandle) {
    let p = store.add_post("P", "post", true).await.unwrap();
    let c1 = store.add_comment(&p.id, None, "C1").await.unwrap();
    let c2 = store.add_comment(&p.id, Some(&c1.id), "C2").await.unwrap();
    let c3 = store.add_comment(&p.id, Some(&c2.id), "C3").await.unwrap();

    assert_eq!(ids(&store.get_replies(&c1.id).await.unwrap()), vec![c2.id.clone()]);
    assert_eq!(ids(&store.get_replies(&c2.id).await.unwrap()), vec![c3.id.clone()]);
    assert!(store.get_replies(&c3.id).await.unwrap().is_empty());
    assert_eq!(ids(&store.get_comments(&p.id, 1).await.unwrap()), vec![c1.id.clone()]);
    assert_eq!(store.get_number_of_comment_pages(&p.id).await.unwrap(), 0);

    let replies = store.get_replies(&c1.id).await.unwrap();
    assert_eq!(replies[0].reply_ids, vec![c3.id.clone()]);
    assert_eq!(replies[0].parent_comment_id.as_deref(), Some(c1.id.as_str()));
}

pub async fn identifiers_never_repeat(store: StoreHandle) {
    let mut seen = HashSet::new();
    for i in 0..1_000 {
        let post = store.add_post(&format!("post {i}"), "body", true).await.unwrap();
        let comment = store.add_comment(&post.id, None, "comment").await.unwrap();
        assert!(seen.insert(post.id));
        assert!(seen.insert(comment.id));
    }
    assert_eq!(seen.len(), 2_000);
}

pub async fn missing_ids_are_not_found(store: StoreHandle) {
    let post = store.add_post("t", "c", true).await.unwrap();
    let missing = "00000000-0000-0000-0000-000000000000";

    let post_lookups = [
        store.get_post_by_id(missing).await.map(|_| ()),
        store.get_comments(missing, 1).await.map(|_| ()),
        store.get_number_of_comment_pages(missing).await.map(|_| ()),
        store.add_comment(missing, None, "orphan").await.map(|_| ()),
    ];
    for result in post_lookups {
        let err = result.unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { kind: EntityKind::Post, .. }),
            "{err}"
        );
    }

    let comment_lookups = [
        store.get_comment_by_id(missing).await.map(|_| ()),
        store.get_replies(missing).await.map(|_| ()),
        store.add_comment(&post.id, Some(missing), "orphan").await.map(|_| ()),
    ];
    for result in comment_lookups {
        let err = result.unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { kind: EntityKind::Comment, .. }),
            "{err}"
        );
    }

    let posts = store.get_posts().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].comment_ids.is_empty());
}

pub async fn concurrent_appends_all_land(store: StoreHandle) {
    let post = store.add_post("busy", "thread", true).await.unwrap();
    let root = store.add_comment(&post.id, None, "root").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        let (post_id, root_id) = (post.id.clone(), root.id.clone());
        tasks.push(tokio::spawn(async move {
            let parent = (i % 2 == 0).then_some(root_id.as_str());
            store.add_comment(&post_id, parent, &format!("c{i}")).await.map(|c| c.id)
        }));
    }

    let mut created = HashSet::new();
    for task in tasks {
        created.insert(task.await.unwrap().unwrap());
    }
    assert_eq!(created.len(), 40);

    let post = store.get_post_by_id(&post.id).await.unwrap();
    assert_eq!(post.comment_ids.len(), 21);
    assert_eq!(post.comment_ids[0], root.id);

    let replies = store.get_replies(&root.id).await.unwrap();
    assert_eq!(replies.len(), 20);
    assert!(replies.iter().all(|r| created.contains(&r.id)));
}
