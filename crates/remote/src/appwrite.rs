//! Appwrite binding.
//!
//! Talks to the Appwrite REST API directly: account sessions, documents in
//! the blog database and files in the image bucket. Images are referenced by
//! file ID and resolved to preview URLs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use quill_core::blog::{
    Backend, Credentials, ImageRef, ImageUpload, NewAccount, NewPost, Post, PostPatch, PostQuery,
    Profile, Session, User,
};
use quill_core::session::{SessionCache, StoredSession};
use quill_shared::config::ResourceNames;
use quill_shared::types::{FileId, PostId, SessionId, UserId};
use quill_shared::{AppConfig, AppError, AppResult};

use crate::http::{build_client, expect_success, is_not_found, read_json, transport_error};

const PROVIDER: &str = "appwrite";
const PROJECT_HEADER: &str = "X-Appwrite-Project";
const SESSION_HEADER: &str = "X-Appwrite-Session";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

// ----------------------------------------------------------------------------
// Queries
// ----------------------------------------------------------------------------

/// `orderDesc(attribute)` query.
pub fn order_desc(attribute: &str) -> String {
    json!({ "method": "orderDesc", "attribute": attribute }).to_string()
}

/// `limit(n)` query.
pub fn limit(n: u32) -> String {
    json!({ "method": "limit", "values": [n] }).to_string()
}

/// `equal(attribute, value)` query.
pub fn equal(attribute: &str, value: &str) -> String {
    json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
}

// ----------------------------------------------------------------------------
// Wire types
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AccountDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "$createdAt", default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<AccountDto> for User {
    fn from(dto: AccountDto) -> Self {
        Self {
            id: UserId::new(dto.id),
            email: dto.email,
            name: dto.name,
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    expire: Option<DateTime<Utc>>,
    #[serde(default)]
    secret: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList<T> {
    documents: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PostDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "$createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt", default)]
    updated_at: Option<DateTime<Utc>>,
    title: String,
    content: String,
    #[serde(rename = "authorId")]
    author_id: String,
    #[serde(rename = "authorName", default)]
    author_name: Option<String>,
    #[serde(rename = "imageId", default)]
    image_id: Option<String>,
    #[serde(default)]
    published: Option<bool>,
}

impl From<PostDocument> for Post {
    fn from(doc: PostDocument) -> Self {
        Self {
            id: PostId::new(doc.id),
            title: doc.title,
            content: doc.content,
            image: doc
                .image_id
                .filter(|id| !id.is_empty())
                .map(|id| ImageRef::File(FileId::new(id))),
            author_id: UserId::new(doc.author_id),
            author_name: doc.author_name.unwrap_or_default(),
            published: doc.published.unwrap_or(true),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    bio: Option<String>,
}

impl From<ProfileDocument> for Profile {
    fn from(doc: ProfileDocument) -> Self {
        Self {
            user_id: UserId::new(doc.user_id),
            name: doc.name,
            email: doc.email,
            bio: doc.bio,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileDto {
    #[serde(rename = "$id")]
    id: String,
}

/// Image reference as stored on a post document.
fn image_id(image: &ImageRef) -> AppResult<&str> {
    match image {
        ImageRef::File(id) => Ok(id.as_str()),
        ImageRef::Url(_) => Err(AppError::Validation(
            "Appwrite posts reference images by file ID".to_string(),
        )),
    }
}

/// Reads the session secret Appwrite hands to cookie-less clients.
fn fallback_cookie_secret(headers: &HeaderMap, project_id: &str) -> Option<String> {
    let raw = headers.get(FALLBACK_COOKIES_HEADER)?.to_str().ok()?;
    let cookies: HashMap<String, String> = serde_json::from_str(raw).ok()?;
    cookies
        .get(&format!("a_session_{project_id}"))
        .filter(|secret| !secret.is_empty())
        .cloned()
}

// ----------------------------------------------------------------------------
// Backend
// ----------------------------------------------------------------------------

/// Backend over the Appwrite REST API.
pub struct AppwriteBackend {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    resources: ResourceNames,
    cache: Arc<dyn SessionCache>,
}

impl std::fmt::Debug for AppwriteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppwriteBackend")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl AppwriteBackend {
    /// Creates a binding from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the HTTP client cannot be built.
    pub fn new(config: &AppConfig, cache: Arc<dyn SessionCache>) -> AppResult<Self> {
        Ok(Self::with_client(build_client(&config.http)?, config, cache))
    }

    /// Creates a binding around an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        config: &AppConfig,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            client,
            endpoint: config.appwrite.endpoint.trim_end_matches('/').to_string(),
            project_id: config.appwrite.project_id.trim().to_string(),
            resources: config.resources.clone(),
            cache,
        }
    }

    /// Preview URL of a stored file.
    #[must_use]
    pub fn preview_url(&self, file_id: &FileId) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/preview?project={}",
            self.endpoint, self.resources.bucket, file_id, self.project_id
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.endpoint))
            .header(PROJECT_HEADER, &self.project_id)
    }

    async fn usable_session(&self) -> AppResult<Option<StoredSession>> {
        Ok(self
            .cache
            .load()
            .await?
            .filter(|s| s.is_usable_for(PROVIDER, Utc::now())))
    }

    /// Request carrying the cached session, if there is one.
    async fn authed(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let builder = self.request(method, path);
        Ok(match self.usable_session().await? {
            Some(session) => builder.header(SESSION_HEADER, session.secret),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder, operation: &str) -> AppResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| transport_error(&e, operation))
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{collection}/documents",
            self.resources.database_id
        )
    }

    fn posts_path(&self) -> String {
        self.documents_path(&self.resources.posts_collection)
    }

    fn files_path(&self) -> String {
        format!("/storage/buckets/{}/files", self.resources.bucket)
    }
}

#[async_trait]
impl Backend for AppwriteBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn register(&self, account: &NewAccount) -> AppResult<User> {
        let body = json!({
            "userId": UserId::unique(),
            "email": account.email.trim(),
            "password": account.password,
            "name": account.name.trim(),
        });
        let response = Self::send(
            self.request(Method::POST, "/account").json(&body),
            "create account",
        )
        .await?;
        read_json::<AccountDto>(response, "create account")
            .await
            .map(User::from)
    }

    async fn open_session(&self, credentials: &Credentials) -> AppResult<Session> {
        let body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
        });
        let response = Self::send(
            self.request(Method::POST, "/account/sessions/email")
                .json(&body),
            "create session",
        )
        .await?;
        let headers = response.headers().clone();
        let dto: SessionDto = read_json(response, "create session").await?;

        let secret = fallback_cookie_secret(&headers, &self.project_id)
            .or_else(|| Some(dto.secret.clone()).filter(|s| !s.is_empty()))
            .ok_or_else(|| {
                AppError::ExternalService("Appwrite returned no session secret".to_string())
            })?;

        let response = Self::send(
            self.request(Method::GET, "/account")
                .header(SESSION_HEADER, &secret),
            "get account",
        )
        .await?;
        let user = User::from(read_json::<AccountDto>(response, "get account").await?);

        let session_id = SessionId::new(dto.id);
        self.cache
            .store(&StoredSession {
                provider: PROVIDER.to_string(),
                session_id: session_id.clone(),
                user_id: UserId::new(dto.user_id),
                secret,
                expires_at: dto.expire,
                refresh_token: None,
            })
            .await?;

        Ok(Session {
            id: session_id,
            user,
            expires_at: dto.expire,
        })
    }

    async fn close_sessions(&self) -> AppResult<()> {
        let session = self
            .usable_session()
            .await?
            .ok_or_else(|| AppError::Unauthorized("no active session".to_string()))?;

        let response = Self::send(
            self.request(Method::DELETE, "/account/sessions")
                .header(SESSION_HEADER, &session.secret),
            "delete sessions",
        )
        .await;
        // The secret is useless after a logout attempt either way.
        self.cache.clear().await?;
        expect_success(response?, "delete sessions").await
    }

    async fn current_account(&self) -> AppResult<Option<User>> {
        let Some(session) = self.usable_session().await? else {
            return Ok(None);
        };

        let response = Self::send(
            self.request(Method::GET, "/account")
                .header(SESSION_HEADER, &session.secret),
            "get account",
        )
        .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("cached Appwrite session was rejected");
            self.cache.clear().await?;
            return Ok(None);
        }
        read_json::<AccountDto>(response, "get account")
            .await
            .map(|dto| Some(User::from(dto)))
    }

    async fn find_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        let path = self.documents_path(&self.resources.users_collection);
        let request = self.authed(Method::GET, &path).await?.query(&[
            ("queries[]", equal("userId", user_id.as_str())),
            ("queries[]", limit(1)),
        ]);
        let response = Self::send(request, "find profile").await?;
        let list: DocumentList<ProfileDocument> = read_json(response, "find profile").await?;
        Ok(list.documents.into_iter().next().map(Profile::from))
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<Profile> {
        let path = self.documents_path(&self.resources.users_collection);
        let body = json!({
            "documentId": UserId::unique(),
            "data": {
                "userId": profile.user_id,
                "name": profile.name,
                "email": profile.email,
                "bio": profile.bio,
            },
        });
        let request = self.authed(Method::POST, &path).await?.json(&body);
        let response = Self::send(request, "create profile").await?;
        read_json::<ProfileDocument>(response, "create profile")
            .await
            .map(Profile::from)
    }

    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        let mut queries = vec![
            ("queries[]", order_desc("$createdAt")),
            ("queries[]", limit(query.limit)),
        ];
        if let Some(author_id) = &query.author_id {
            queries.push(("queries[]", equal("authorId", author_id.as_str())));
        }

        let request = self
            .authed(Method::GET, &self.posts_path())
            .await?
            .query(&queries);
        let response = Self::send(request, "list posts").await?;
        let list: DocumentList<PostDocument> = read_json(response, "list posts").await?;
        Ok(list.documents.into_iter().map(Post::from).collect())
    }

    async fn find_post(&self, id: &PostId) -> AppResult<Option<Post>> {
        let path = format!("{}/{id}", self.posts_path());
        let response = Self::send(self.authed(Method::GET, &path).await?, "get post").await?;
        if is_not_found(&response) {
            return Ok(None);
        }
        read_json::<PostDocument>(response, "get post")
            .await
            .map(|doc| Some(Post::from(doc)))
    }

    async fn insert_post(&self, post: &NewPost) -> AppResult<Post> {
        let image = post.image.as_ref().map(image_id).transpose()?;
        let body = json!({
            "documentId": PostId::unique(),
            "data": {
                "title": post.title,
                "content": post.content,
                "authorId": post.author_id,
                "authorName": post.author_name,
                "imageId": image,
                "published": true,
            },
        });
        let request = self
            .authed(Method::POST, &self.posts_path())
            .await?
            .json(&body);
        let response = Self::send(request, "create post").await?;
        read_json::<PostDocument>(response, "create post")
            .await
            .map(Post::from)
    }

    async fn patch_post(&self, id: &PostId, patch: &PostPatch) -> AppResult<Post> {
        let mut data = Map::new();
        if let Some(title) = &patch.title {
            data.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(content) = &patch.content {
            data.insert("content".into(), Value::from(content.as_str()));
        }
        if let Some(image) = &patch.image {
            data.insert("imageId".into(), Value::from(image_id(image)?));
        }
        if let Some(published) = patch.published {
            data.insert("published".into(), Value::from(published));
        }

        let path = format!("{}/{id}", self.posts_path());
        let request = self
            .authed(Method::PATCH, &path)
            .await?
            .json(&json!({ "data": data }));
        let response = Self::send(request, "update post").await?;
        read_json::<PostDocument>(response, "update post")
            .await
            .map(Post::from)
    }

    async fn remove_post(&self, id: &PostId) -> AppResult<()> {
        let path = format!("{}/{id}", self.posts_path());
        let response = Self::send(self.authed(Method::DELETE, &path).await?, "delete post").await?;
        expect_success(response, "delete post").await
    }

    async fn store_image(&self, upload: &ImageUpload) -> AppResult<ImageRef> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| AppError::Validation(format!("invalid content type: {e}")))?;
        let form = Form::new()
            .text("fileId", FileId::unique().into_inner())
            .part("file", part);

        let request = self
            .authed(Method::POST, &self.files_path())
            .await?
            .multipart(form);
        let response = Self::send(request, "upload image").await?;
        let file: FileDto = read_json(response, "upload image").await?;
        Ok(ImageRef::File(FileId::new(file.id)))
    }

    async fn image_url(&self, image: &ImageRef) -> AppResult<String> {
        let id = match image {
            ImageRef::Url(url) => return Ok(url.clone()),
            ImageRef::File(id) => id,
        };

        let path = format!("{}/{id}", self.files_path());
        let response = Self::send(self.authed(Method::GET, &path).await?, "get file").await?;
        expect_success(response, "get file").await?;
        Ok(self.preview_url(id))
    }
}
