//! The blog facade.
//!
//! [`Blog`] is the single entry point the presentation layer uses. It
//! validates input, sequences multi-step flows and normalizes provider
//! failures into [`AppError`]. It never retries and never rolls back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info, instrument, warn};

use quill_shared::config::IdempotencyConfig;
use quill_shared::types::{PostId, UserId};
use quill_shared::{AppError, AppResult, UploadConfig};

use super::backend::Backend;
use super::types::{
    Credentials, CurrentUser, DEFAULT_POST_LIMIT, IdempotencyKey, ImageRef, ImageUpload,
    NewAccount, NewPost, Post, PostPatch, PostQuery, Profile, PublishRequest, Session, User,
};
use super::validation;

/// Provider-neutral blog facade.
///
/// Cheap to share behind an `Arc`; holds no lock across provider calls.
pub struct Blog {
    backend: Arc<dyn Backend>,
    uploads: UploadConfig,
    post_writes: Cache<String, Post>,
    image_writes: Cache<String, ImageRef>,
}

impl std::fmt::Debug for Blog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blog")
            .field("backend", &self.backend.name())
            .field("uploads", &self.uploads)
            .finish_non_exhaustive()
    }
}

impl Blog {
    /// Creates a facade with default upload limits and idempotency settings.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(
            backend,
            UploadConfig::default(),
            &IdempotencyConfig::default(),
        )
    }

    /// Creates a facade with explicit upload limits and idempotency settings.
    #[must_use]
    pub fn with_config(
        backend: Arc<dyn Backend>,
        uploads: UploadConfig,
        idempotency: &IdempotencyConfig,
    ) -> Self {
        let ttl = Duration::from_secs(idempotency.ttl_secs);
        Self {
            backend,
            uploads,
            post_writes: Cache::builder()
                .max_capacity(idempotency.capacity)
                .time_to_live(ttl)
                .build(),
            image_writes: Cache::builder()
                .max_capacity(idempotency.capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Name of the provider behind this facade.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        self.backend.name()
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Registers an account, signs it in and stores its profile.
    ///
    /// The profile is written with the new session so row-level policies
    /// that require the owner see the user, not an anonymous caller.
    ///
    /// # Errors
    ///
    /// `Validation` before any provider call; otherwise the first failing
    /// step's error. Steps already done are not undone.
    #[instrument(
        skip(self, account),
        fields(provider = self.backend.name(), email = %account.email)
    )]
    pub async fn create_account(&self, account: &NewAccount) -> AppResult<Session> {
        validation::validate_new_account(account)?;

        let user = self
            .backend
            .register(account)
            .await
            .inspect_err(|e| warn!(error = %e, "registration failed"))?;

        let session = self
            .backend
            .open_session(&Credentials::from(account))
            .await
            .inspect_err(|e| {
                warn!(user_id = %user.id, error = %e, "account created but sign-in failed");
            })?;

        let profile = Profile {
            user_id: user.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            bio: None,
        };
        if let Err(e) = self.backend.insert_profile(&profile).await {
            warn!(user_id = %user.id, error = %e, "signed in but profile was not stored");
            return Err(e);
        }

        info!(user_id = %session.user.id, "account created");
        Ok(session)
    }

    /// Opens a session with email and password.
    ///
    /// # Errors
    ///
    /// `Validation` on empty fields, `Unauthorized` on bad credentials.
    #[instrument(
        skip(self, credentials),
        fields(provider = self.backend.name(), email = %credentials.email)
    )]
    pub async fn login(&self, credentials: &Credentials) -> AppResult<Session> {
        validation::validate_credentials(credentials)?;
        let session = self
            .backend
            .open_session(credentials)
            .await
            .inspect_err(|e| warn!(error = %e, "login failed"))?;
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Propagates the provider failure, including "no active session".
    #[instrument(skip(self), fields(provider = self.backend.name()))]
    pub async fn logout(&self) -> AppResult<()> {
        self.backend
            .close_sessions()
            .await
            .inspect_err(|e| warn!(error = %e, "logout failed"))?;
        info!("signed out");
        Ok(())
    }

    /// Returns who is signed in. Never fails.
    pub async fn current_user(&self) -> CurrentUser {
        match self.backend.current_account().await {
            Ok(user) => CurrentUser::from(user),
            Err(e) => {
                debug!(provider = self.backend.name(), error = %e, "no usable session");
                CurrentUser::Anonymous
            }
        }
    }

    /// Looks up a user's profile.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures. A missing profile is `Ok(None)`.
    pub async fn user_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        validation::validate_id("user", user_id.as_str())?;
        self.backend
            .find_profile(user_id)
            .await
            .inspect_err(|e| warn!(%user_id, error = %e, "profile lookup failed"))
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Lists posts newest first, never more than `query.limit`.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero limit; otherwise propagates query failures.
    pub async fn posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        validation::validate_query(query)?;
        let mut posts = self
            .backend
            .list_posts(query)
            .await
            .inspect_err(|e| warn!(error = %e, "listing posts failed"))?;

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(query.limit as usize);
        Ok(posts)
    }

    /// Lists the latest posts; the limit defaults to [`DEFAULT_POST_LIMIT`].
    ///
    /// # Errors
    ///
    /// See [`Blog::posts`].
    pub async fn latest_posts(&self, limit: Option<u32>) -> AppResult<Vec<Post>> {
        self.posts(&PostQuery::latest(limit.unwrap_or(DEFAULT_POST_LIMIT)))
            .await
    }

    /// Fetches a post.
    ///
    /// # Errors
    ///
    /// `NotFound` when the post does not exist.
    pub async fn post(&self, id: &PostId) -> AppResult<Post> {
        validation::validate_id("post", id.as_str())?;
        self.backend
            .find_post(id)
            .await
            .inspect_err(|e| warn!(post_id = %id, error = %e, "fetching post failed"))?
            .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))
    }

    /// Creates a post.
    ///
    /// With a key, repeated and concurrent calls share one provider call and
    /// return the same post.
    ///
    /// # Errors
    ///
    /// `Validation` on empty title or content; provider failures propagate.
    #[instrument(
        skip(self, post, key),
        fields(provider = self.backend.name(), author_id = %post.author_id)
    )]
    pub async fn create_post(
        &self,
        post: &NewPost,
        key: Option<&IdempotencyKey>,
    ) -> AppResult<Post> {
        validation::validate_new_post(post)?;
        let created = coalesce(&self.post_writes, key, post.fingerprint(), async {
            self.backend
                .insert_post(post)
                .await
                .inspect_err(|e| warn!(error = %e, "creating post failed"))
        })
        .await?;
        info!(post_id = %created.id, "post created");
        Ok(created)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// `Validation` on an empty patch; `NotFound` and `Forbidden` propagate.
    #[instrument(skip(self, patch), fields(provider = self.backend.name()))]
    pub async fn update_post(&self, id: &PostId, patch: &PostPatch) -> AppResult<Post> {
        validation::validate_id("post", id.as_str())?;
        validation::validate_patch(patch)?;
        let updated = self
            .backend
            .patch_post(id, patch)
            .await
            .inspect_err(|e| warn!(error = %e, "updating post failed"))?;
        info!("post updated");
        Ok(updated)
    }

    /// Deletes a post.
    ///
    /// # Errors
    ///
    /// `NotFound` when the post does not exist.
    #[instrument(skip(self), fields(provider = self.backend.name()))]
    pub async fn delete_post(&self, id: &PostId) -> AppResult<()> {
        validation::validate_id("post", id.as_str())?;
        self.backend
            .remove_post(id)
            .await
            .inspect_err(|e| warn!(error = %e, "deleting post failed"))?;
        info!("post deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Uploads an image.
    ///
    /// # Errors
    ///
    /// `Validation` on an empty, oversized or non-image payload; provider
    /// failures propagate.
    #[instrument(
        skip(self, upload, key),
        fields(
            provider = self.backend.name(),
            filename = %upload.filename,
            size = upload.size()
        )
    )]
    pub async fn upload_image(
        &self,
        upload: &ImageUpload,
        key: Option<&IdempotencyKey>,
    ) -> AppResult<ImageRef> {
        validation::validate_upload(upload, &self.uploads)?;
        let image = coalesce(&self.image_writes, key, upload.fingerprint(), async {
            self.backend
                .store_image(upload)
                .await
                .inspect_err(|e| warn!(error = %e, "image upload failed"))
        })
        .await?;
        info!(image = %image, "image stored");
        Ok(image)
    }

    /// Resolves an image reference to a fetchable URL.
    ///
    /// URL references resolve locally; file references ask the provider.
    ///
    /// # Errors
    ///
    /// Propagates provider failures for file references.
    pub async fn image_url(&self, image: &ImageRef) -> AppResult<String> {
        match image {
            ImageRef::Url(url) => Ok(url.clone()),
            ImageRef::File(id) => {
                validation::validate_id("file", id.as_str())?;
                self.backend
                    .image_url(image)
                    .await
                    .inspect_err(|e| warn!(file_id = %id, error = %e, "resolving image failed"))
            }
        }
    }

    // ------------------------------------------------------------------
    // Page flows
    // ------------------------------------------------------------------

    /// Uploads the optional cover image, then creates a post authored by the
    /// signed-in user.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a session, `Validation` on bad input, otherwise
    /// the failing step's error.
    #[instrument(skip(self, request), fields(provider = self.backend.name()))]
    pub async fn publish(&self, request: &PublishRequest) -> AppResult<Post> {
        let user = self.require_user().await?;

        let draft = NewPost {
            title: request.title.clone(),
            content: request.content.clone(),
            author_id: user.id.clone(),
            author_name: String::new(),
            image: None,
        };
        // Reject bad text before spending an upload on it.
        validation::validate_new_post(&draft)?;

        let key = request.idempotency_key.as_ref();
        let image = match &request.image {
            Some(upload) => Some(
                self.upload_image(upload, key.map(|k| k.scoped("image")).as_ref())
                    .await?,
            ),
            None => None,
        };

        let author_name = self.author_name(&user).await?;
        let post = NewPost {
            author_name,
            image,
            ..draft
        };
        self.create_post(&post, key.map(|k| k.scoped("post")).as_ref())
            .await
    }

    /// Lists the signed-in user's posts, newest first.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a session.
    pub async fn my_posts(&self, limit: Option<u32>) -> AppResult<Vec<Post>> {
        let user = self.require_user().await?;
        self.posts(&PostQuery::by_author(
            user.id,
            limit.unwrap_or(DEFAULT_POST_LIMIT),
        ))
        .await
    }

    async fn require_user(&self) -> AppResult<User> {
        self.current_user()
            .await
            .into_user()
            .ok_or_else(|| AppError::Unauthorized("sign in first".to_string()))
    }

    /// Profile name, then account name, then email, then `Anonymous`.
    async fn author_name(&self, user: &User) -> AppResult<String> {
        let profile = self.user_profile(&user.id).await?;
        Ok(profile
            .map(|p| p.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| user.display_name().to_string()))
    }
}

/// Runs `write` once per key and payload while its result is cached.
///
/// Concurrent callers with the same key and payload wait on the same
/// future. Failures are not cached, so a later call with the key retries.
async fn coalesce<V, F>(
    cache: &Cache<String, V>,
    key: Option<&IdempotencyKey>,
    payload: String,
    write: F,
) -> AppResult<V>
where
    V: Clone + Send + Sync + 'static,
    F: Future<Output = AppResult<V>>,
{
    match key {
        Some(key) => cache
            .try_get_with(format!("{}#{payload}", key.as_str()), write)
            .await
            .map_err(Arc::unwrap_or_clone),
        None => write.await,
    }
}
