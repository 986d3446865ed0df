//! Self-hosted provider: SQL tables plus an OpenDAL bucket.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use quill_core::auth::{hash_password, verify_password};
use quill_core::blog::{
    Backend, Credentials, ImageRef, ImageUpload, NewAccount, NewPost, Post, PostPatch, PostQuery,
    Profile, Session, User,
};
use quill_core::session::{SessionCache, StoredSession};
use quill_core::storage::{StorageConfig, StorageProvider, StorageService};
use quill_shared::types::{FileId, PostId, SessionId, UserId};
use quill_shared::{AppConfig, AppError, AppResult, JwtService};

use crate::entities::{posts, profiles, users};
use crate::error::map_db_err;
use crate::migration::Migrator;
use crate::repositories::{
    CreateFileInput, FileRepository, PostRepository, ProfileRepository, SessionRepository,
    UserRepository,
};

const PROVIDER: &str = "local";

/// Backend over a SeaORM database and an OpenDAL bucket.
pub struct LocalBackend {
    users: UserRepository,
    profiles: ProfileRepository,
    posts: PostRepository,
    sessions: SessionRepository,
    files: FileRepository,
    storage: StorageService,
    jwt: JwtService,
    cache: Arc<dyn SessionCache>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl LocalBackend {
    /// Assembles a backend from an open, migrated connection.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        storage: StorageService,
        jwt: JwtService,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            profiles: ProfileRepository::new(db.clone()),
            posts: PostRepository::new(db.clone()),
            sessions: SessionRepository::new(db.clone()),
            files: FileRepository::new(db),
            storage,
            jwt,
            cache,
        }
    }

    /// Connects to the configured database, applies pending migrations and
    /// opens the image bucket on the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns `Database` or `Storage` when either side cannot be opened.
    pub async fn connect(config: &AppConfig, cache: Arc<dyn SessionCache>) -> AppResult<Self> {
        let db = crate::connect(&config.local.database_url).await?;
        Migrator::up(&db, None).await.map_err(map_db_err)?;

        tokio::fs::create_dir_all(&config.local.storage_root)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let storage = StorageService::from_config(
            StorageConfig::new(
                StorageProvider::local_fs(&config.local.storage_root),
                config.local.public_base_url.clone(),
            )
            .with_bucket(config.resources.bucket.clone())
            .with_uploads(config.uploads.clone()),
        )?;

        info!(bucket = %config.resources.bucket, "local provider ready");
        Ok(Self::new(
            db,
            storage,
            JwtService::new(config.jwt.clone()),
            cache,
        ))
    }

    /// Resolves the cached session to its account.
    ///
    /// Stale or foreign sessions are dropped from the cache and read as
    /// signed out.
    async fn session_user(&self) -> AppResult<Option<users::Model>> {
        let Some(stored) = self.cache.load().await? else {
            return Ok(None);
        };
        if !stored.is_usable_for(PROVIDER, chrono::Utc::now()) {
            self.cache.clear().await?;
            return Ok(None);
        }

        let claims = match self.jwt.validate(&stored.secret) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "discarding unusable session token");
                self.cache.clear().await?;
                return Ok(None);
            }
        };

        let active = self
            .sessions
            .find_active(&claims.session_id(), &stored.secret)
            .await
            .map_err(map_db_err)?;
        if active.is_none() {
            self.cache.clear().await?;
            return Ok(None);
        }

        self.users
            .find_by_id(&claims.user_id())
            .await
            .map_err(map_db_err)
    }

    async fn require_author(&self, author_id: &str) -> AppResult<()> {
        let user = self
            .session_user()
            .await?
            .ok_or_else(|| AppError::Unauthorized("sign in first".to_string()))?;
        if user.id != author_id {
            return Err(AppError::Forbidden(
                "only the author can change this post".to_string(),
            ));
        }
        Ok(())
    }

    async fn existing_post(&self, id: &PostId) -> AppResult<posts::Model> {
        self.posts
            .find(id)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))
    }
}

fn to_user(model: users::Model) -> User {
    User {
        id: UserId::new(model.id),
        email: model.email,
        name: model.name,
        created_at: Some(model.created_at),
    }
}

fn to_profile(model: profiles::Model) -> Profile {
    Profile {
        user_id: UserId::new(model.user_id),
        name: model.name,
        email: model.email,
        bio: model.bio,
    }
}

fn to_post(model: posts::Model) -> Post {
    let image = match (model.image_id, model.image_url) {
        (Some(id), _) => Some(ImageRef::File(FileId::new(id))),
        (None, Some(url)) => Some(ImageRef::Url(url)),
        (None, None) => None,
    };
    Post {
        id: PostId::new(model.id),
        title: model.title,
        content: model.content,
        image,
        author_id: UserId::new(model.author_id),
        author_name: model.author_name,
        published: model.published,
        created_at: model.created_at,
        updated_at: Some(model.updated_at),
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn register(&self, account: &NewAccount) -> AppResult<User> {
        let email = account.email.trim().to_lowercase();
        if self.users.email_exists(&email).await.map_err(map_db_err)? {
            return Err(AppError::Conflict(
                "a user with the same email already exists".to_string(),
            ));
        }

        let password = account.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        let user = self
            .users
            .create(&email, &hash, account.name.trim())
            .await
            .map_err(map_db_err)?;
        Ok(to_user(user))
    }

    async fn open_session(&self, credentials: &Credentials) -> AppResult<Session> {
        let invalid = || AppError::Unauthorized("invalid email or password".to_string());

        let email = credentials.email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_db_err)?
            .ok_or_else(invalid)?;

        let password = credentials.password.clone();
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        if !verified {
            return Err(invalid());
        }

        let user_id = UserId::new(user.id.clone());
        let session_id = SessionId::unique();
        let issued = self.jwt.issue(&user_id, &session_id)?;
        self.sessions
            .create(&session_id, &user_id, &issued.token, issued.expires_at)
            .await
            .map_err(map_db_err)?;

        self.cache
            .store(&StoredSession {
                provider: PROVIDER.to_string(),
                session_id: session_id.clone(),
                user_id,
                secret: issued.token,
                expires_at: Some(issued.expires_at),
                refresh_token: None,
            })
            .await?;

        Ok(Session {
            id: session_id,
            user: to_user(user),
            expires_at: Some(issued.expires_at),
        })
    }

    async fn close_sessions(&self) -> AppResult<()> {
        let user = self
            .session_user()
            .await?
            .ok_or_else(|| AppError::Unauthorized("no active session".to_string()))?;

        let revoked = self
            .sessions
            .revoke_all_user_sessions(&UserId::new(user.id))
            .await
            .map_err(map_db_err)?;
        debug!(revoked, "sessions revoked");
        self.cache.clear().await
    }

    async fn current_account(&self) -> AppResult<Option<User>> {
        Ok(self.session_user().await?.map(to_user))
    }

    async fn find_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        Ok(self
            .profiles
            .find(user_id)
            .await
            .map_err(map_db_err)?
            .map(to_profile))
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<Profile> {
        self.profiles
            .create(profile)
            .await
            .map(to_profile)
            .map_err(map_db_err)
    }

    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        let rows = self.posts.list(query).await.map_err(map_db_err)?;
        Ok(rows.into_iter().map(to_post).collect())
    }

    async fn find_post(&self, id: &PostId) -> AppResult<Option<Post>> {
        Ok(self.posts.find(id).await.map_err(map_db_err)?.map(to_post))
    }

    async fn insert_post(&self, post: &NewPost) -> AppResult<Post> {
        self.require_author(post.author_id.as_str()).await?;
        self.posts
            .create(post)
            .await
            .map(to_post)
            .map_err(map_db_err)
    }

    async fn patch_post(&self, id: &PostId, patch: &PostPatch) -> AppResult<Post> {
        let existing = self.existing_post(id).await?;
        self.require_author(&existing.author_id).await?;

        self.posts
            .update(id, patch)
            .await
            .map_err(map_db_err)?
            .map(to_post)
            .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))
    }

    async fn remove_post(&self, id: &PostId) -> AppResult<()> {
        let existing = self.existing_post(id).await?;
        self.require_author(&existing.author_id).await?;

        if self.posts.delete(id).await.map_err(map_db_err)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("post {id} not found")))
        }
    }

    async fn store_image(&self, upload: &ImageUpload) -> AppResult<ImageRef> {
        let file_id = FileId::unique();
        let stored = self
            .storage
            .put_image(
                &file_id,
                &upload.filename,
                &upload.content_type,
                upload.bytes.clone(),
            )
            .await?;

        let recorded = self
            .files
            .create(CreateFileInput {
                id: file_id.clone(),
                bucket: self.storage.config().bucket.clone(),
                storage_key: stored.key.clone(),
                filename: upload.filename.clone(),
                content_type: upload.content_type.clone(),
                size: stored.size,
            })
            .await;
        if let Err(e) = recorded {
            // Keep the bucket free of objects nothing points at.
            if let Err(cleanup) = self.storage.delete(&stored.key).await {
                debug!(key = %stored.key, error = %cleanup, "orphaned image left in bucket");
            }
            return Err(map_db_err(e));
        }

        Ok(ImageRef::File(file_id))
    }

    async fn image_url(&self, image: &ImageRef) -> AppResult<String> {
        match image {
            ImageRef::Url(url) => Ok(url.clone()),
            ImageRef::File(id) => {
                let file = self
                    .files
                    .find(id)
                    .await
                    .map_err(map_db_err)?
                    .ok_or_else(|| AppError::NotFound(format!("file {id} not found")))?;
                // A row without its object is as good as missing.
                self.storage.stat(&file.storage_key).await?;
                Ok(self.storage.public_url(&file.storage_key))
            }
        }
    }
}
