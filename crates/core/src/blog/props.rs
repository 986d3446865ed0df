//! Property-based tests for feed queries.
//!
//! - Feed never returns more than `limit` posts
//! - Feed is ordered newest first whatever order the provider answers in

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use quill_shared::types::{PostId, UserId};

use super::backend::MockBackend;
use super::service::Blog;
use super::types::{Post, PostQuery};

fn post_at(index: usize, minutes: i64) -> Post {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Post {
        id: PostId::new(format!("p{index}")),
        title: format!("Post {index}"),
        content: "Body".to_string(),
        image: None,
        author_id: UserId::new("alice"),
        author_name: "Alice".to_string(),
        published: true,
        created_at: base + Duration::minutes(minutes),
        updated_at: None,
    }
}

fn run_feed(posts: Vec<Post>, limit: u32) -> Vec<Post> {
    let mut backend = MockBackend::new();
    backend.expect_name().return_const("mock");
    backend
        .expect_list_posts()
        .returning(move |_| Ok(posts.clone()));
    let blog = Blog::new(Arc::new(backend));

    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(blog.posts(&PostQuery::latest(limit)))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_feed_length_is_bounded_by_limit(
        minutes in prop::collection::vec(0i64..100_000, 0..40),
        limit in 1u32..30,
    ) {
        let count = minutes.len();
        let posts = minutes.into_iter().enumerate().map(|(i, m)| post_at(i, m)).collect();

        let feed = run_feed(posts, limit);

        prop_assert_eq!(feed.len(), count.min(limit as usize));
    }

    #[test]
    fn test_feed_is_newest_first(
        minutes in prop::collection::vec(0i64..100_000, 1..40),
        limit in 1u32..50,
    ) {
        let mut newest: Vec<i64> = minutes.clone();
        newest.sort_unstable_by(|a, b| b.cmp(a));
        let posts = minutes.into_iter().enumerate().map(|(i, m)| post_at(i, m)).collect();

        let feed = run_feed(posts, limit);

        for pair in feed.windows(2) {
            prop_assert!(pair[0].created_at >= pair[1].created_at);
        }
        // The feed keeps the newest posts, not an arbitrary subset.
        if let Some(first) = feed.first() {
            prop_assert_eq!(first.created_at, post_at(0, newest[0]).created_at);
        }
    }
}
