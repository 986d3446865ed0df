//! The provider seam.
//!
//! Every provider binding implements [`Backend`]. The facade only ever holds
//! an `Arc<dyn Backend>`, so no provider type leaks past this trait.

use async_trait::async_trait;

use quill_shared::AppResult;
use quill_shared::types::{PostId, UserId};

use super::types::{
    Credentials, ImageRef, ImageUpload, NewAccount, NewPost, Post, PostPatch, PostQuery, Profile,
    Session, User,
};

/// Capability set of a backend-as-a-service provider.
///
/// Methods map one-to-one onto provider calls. Multi-step flows and input
/// validation belong to [`super::Blog`], not here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    // --- Account and session ---

    /// Creates an auth identity. Does not sign in.
    async fn register(&self, account: &NewAccount) -> AppResult<User>;

    /// Opens an email/password session and caches its secret.
    async fn open_session(&self, credentials: &Credentials) -> AppResult<Session>;

    /// Ends the cached session(s) and forgets the secret.
    async fn close_sessions(&self) -> AppResult<()>;

    /// Returns the account behind the cached session.
    ///
    /// `Ok(None)` when no session is cached.
    async fn current_account(&self) -> AppResult<Option<User>>;

    // --- Documents ---

    /// Looks up the profile document of a user.
    async fn find_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>>;

    /// Stores a profile document.
    async fn insert_profile(&self, profile: &Profile) -> AppResult<Profile>;

    /// Lists posts newest first, at most `query.limit` of them.
    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>>;

    /// Fetches one post; `Ok(None)` when it does not exist.
    async fn find_post(&self, id: &PostId) -> AppResult<Option<Post>>;

    /// Creates a post with a provider-generated ID.
    async fn insert_post(&self, post: &NewPost) -> AppResult<Post>;

    /// Applies a partial update and returns the stored result.
    async fn patch_post(&self, id: &PostId, patch: &PostPatch) -> AppResult<Post>;

    /// Deletes a post. `NotFound` when it does not exist.
    async fn remove_post(&self, id: &PostId) -> AppResult<()>;

    // --- Files ---

    /// Uploads an image to the bucket.
    async fn store_image(&self, upload: &ImageUpload) -> AppResult<ImageRef>;

    /// Resolves a stored reference to a fetchable URL.
    async fn image_url(&self, image: &ImageRef) -> AppResult<String>;
}
