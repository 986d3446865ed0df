//! Integration tests for the self-hosted provider.
//!
//! Each test gets its own in-memory SQLite database and memory bucket.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

use quill_core::Blog;
use quill_core::blog::{
    Credentials, CurrentUser, IdempotencyKey, ImageRef, ImageUpload, NewAccount, NewPost,
    PostPatch, PostQuery, PublishRequest,
};
use quill_core::session::{MemorySessionCache, SessionCache};
use quill_core::storage::{StorageConfig, StorageProvider, StorageService};
use quill_db::LocalBackend;
use quill_db::migration::Migrator;
use quill_shared::{AppError, JwtConfig, JwtService};

struct Harness {
    blog: Blog,
    cache: Arc<MemorySessionCache>,
}

async fn harness() -> Harness {
    // One connection: every new connection to `sqlite::memory:` is a new database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open sqlite");
    Migrator::up(&db, None).await.expect("Failed to migrate");

    let storage = StorageService::from_config(StorageConfig::new(
        StorageProvider::Memory,
        "http://localhost:8080/uploads",
    ))
    .expect("Failed to open memory bucket");
    let jwt = JwtService::new(JwtConfig {
        secret: "integration-test-secret".to_string(),
        ..JwtConfig::default()
    });

    let cache = Arc::new(MemorySessionCache::new());
    let backend = LocalBackend::new(db, storage, jwt, cache.clone());
    Harness {
        blog: Blog::new(Arc::new(backend)),
        cache,
    }
}

fn account(name: &str) -> NewAccount {
    NewAccount {
        email: format!("{}@example.com", name.to_lowercase()),
        password: "password123".to_string(),
        name: name.to_string(),
    }
}

fn draft(blog_user: &quill_core::blog::User, title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "World".to_string(),
        author_id: blog_user.id.clone(),
        author_name: blog_user.name.clone(),
        image: None,
    }
}

#[tokio::test]
async fn test_blog_scenario_end_to_end() {
    let Harness { blog, .. } = harness().await;

    let session = blog
        .create_account(&account("Alice"))
        .await
        .expect("Failed to register");
    assert_eq!(session.user.name, "Alice");

    let profile = blog
        .user_profile(&session.user.id)
        .await
        .expect("Failed to read profile")
        .expect("profile should exist");
    assert_eq!(profile.name, "Alice");
    assert!(profile.bio.is_none());

    let created = blog
        .create_post(&draft(&session.user, "Hello"), None)
        .await
        .expect("Failed to create post");

    let feed = blog.posts(&PostQuery::latest(1)).await.expect("Failed to list");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, created.id);
    assert_eq!(feed[0].title, "Hello");
    assert_eq!(feed[0].content, "World");

    let patch = PostPatch {
        content: Some("Updated".to_string()),
        ..PostPatch::default()
    };
    blog.update_post(&created.id, &patch)
        .await
        .expect("Failed to update");
    let fetched = blog.post(&created.id).await.expect("Failed to fetch");
    assert_eq!(fetched.content, "Updated");
    assert_eq!(fetched.title, "Hello");

    blog.delete_post(&created.id).await.expect("Failed to delete");
    let feed = blog.latest_posts(None).await.expect("Failed to list");
    assert!(feed.iter().all(|p| p.id != created.id));
    assert!(blog.post(&created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let Harness { blog, .. } = harness().await;

    blog.create_account(&account("Alice")).await.unwrap();
    let err = blog.create_account(&account("Alice")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn test_invalid_login_leaves_user_anonymous() {
    let Harness { blog, cache } = harness().await;

    blog.create_account(&account("Alice")).await.unwrap();
    blog.logout().await.unwrap();
    assert!(cache.load().await.unwrap().is_none());

    let err = blog
        .login(&Credentials {
            email: "alice@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(blog.current_user().await, CurrentUser::Anonymous);

    let err = blog
        .login(&Credentials {
            email: "nobody@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_login_after_logout_restores_session() {
    let Harness { blog, .. } = harness().await;

    blog.create_account(&account("Alice")).await.unwrap();
    blog.logout().await.unwrap();
    assert!(matches!(blog.logout().await, Err(AppError::Unauthorized(_))));

    let session = blog
        .login(&Credentials::from(&account("Alice")))
        .await
        .unwrap();
    let current = blog.current_user().await;
    assert_eq!(current.user().map(|u| &u.id), Some(&session.user.id));
}

#[tokio::test]
async fn test_feed_is_newest_first_and_filters_by_author() {
    let Harness { blog, .. } = harness().await;

    let bob = blog.create_account(&account("Bob")).await.unwrap().user;
    blog.create_post(&draft(&bob, "Bob 1"), None).await.unwrap();
    blog.logout().await.unwrap();

    let alice = blog.create_account(&account("Alice")).await.unwrap().user;
    for title in ["Alice 1", "Alice 2", "Alice 3"] {
        blog.create_post(&draft(&alice, title), None).await.unwrap();
    }

    let feed = blog.posts(&PostQuery::latest(10)).await.unwrap();
    assert_eq!(feed.len(), 4);
    for pair in feed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
    assert_eq!(feed[0].title, "Alice 3");

    let mine = blog.my_posts(Some(2)).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|p| p.is_authored_by(&alice.id)));

    let bobs = blog
        .posts(&PostQuery::by_author(bob.id.clone(), 10))
        .await
        .unwrap();
    assert_eq!(bobs.len(), 1);
}

#[tokio::test]
async fn test_only_the_author_can_change_a_post() {
    let Harness { blog, .. } = harness().await;

    let bob = blog.create_account(&account("Bob")).await.unwrap().user;
    let post = blog.create_post(&draft(&bob, "Mine"), None).await.unwrap();
    blog.logout().await.unwrap();

    blog.create_account(&account("Alice")).await.unwrap();
    let patch = PostPatch {
        title: Some("Hijacked".to_string()),
        ..PostPatch::default()
    };
    let err = blog.update_post(&post.id, &patch).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(matches!(
        blog.delete_post(&post.id).await,
        Err(AppError::Forbidden(_))
    ));

    // Creating a post in someone else's name is refused too.
    assert!(matches!(
        blog.create_post(&draft(&bob, "Forged"), None).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_writes_require_a_session() {
    let Harness { blog, .. } = harness().await;

    let alice = blog.create_account(&account("Alice")).await.unwrap().user;
    blog.logout().await.unwrap();

    let err = blog
        .create_post(&draft(&alice, "Hello"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_publish_with_image() {
    let Harness { blog, .. } = harness().await;

    blog.create_account(&account("Alice")).await.unwrap();
    let request = PublishRequest {
        title: "Cover".to_string(),
        content: "With a picture".to_string(),
        image: Some(ImageUpload::new("cover photo.png", "image/png", vec![1, 2, 3, 4])),
        idempotency_key: Some(IdempotencyKey::new("compose-1")),
    };

    let post = blog.publish(&request).await.unwrap();
    assert_eq!(post.author_name, "Alice");
    let image = post.image.clone().expect("image attached");
    assert!(matches!(image, ImageRef::File(_)));

    let url = blog.image_url(&image).await.unwrap();
    assert!(url.starts_with("http://localhost:8080/uploads/blog-images/"));
    assert!(url.ends_with("/cover_photo.png"));

    // Same key: same post, no duplicate row.
    let again = blog.publish(&request).await.unwrap();
    assert_eq!(again.id, post.id);
    assert_eq!(blog.my_posts(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_file_is_not_found() {
    let Harness { blog, .. } = harness().await;

    let err = blog
        .image_url(&ImageRef::File(quill_shared::types::FileId::new("missing")))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
