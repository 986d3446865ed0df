//! Supabase binding.
//!
//! GoTrue for accounts, PostgREST for the posts and profiles tables and the
//! storage API for images. Images are public objects referenced by URL.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use quill_core::blog::{
    Backend, Credentials, ImageRef, ImageUpload, NewAccount, NewPost, Post, PostPatch, PostQuery,
    Profile, Session, User,
};
use quill_core::session::{SessionCache, StoredSession};
use quill_shared::config::ResourceNames;
use quill_shared::types::{PostId, SessionId, UserId};
use quill_shared::{AppConfig, AppError, AppResult};

use crate::http::{build_client, expect_success, read_json, status_error, transport_error};

const PROVIDER: &str = "supabase";
const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_UPSERT: &str = "return=representation,resolution=merge-duplicates";

// ----------------------------------------------------------------------------
// Wire types
// ----------------------------------------------------------------------------

/// Accepts both text and numeric primary keys.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

/// Parses a timestamp written as `timestamptz` or as a bare `timestamp`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(parse_timestamp))
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl From<GoTrueUser> for User {
    fn from(user: GoTrueUser) -> Self {
        Self {
            id: UserId::new(user.id),
            email: user.email.unwrap_or_default(),
            name: user
                .user_metadata
                .and_then(|meta| meta.name)
                .unwrap_or_default(),
            created_at: user.created_at,
        }
    }
}

/// Signup answers with the user, or with a session wrapping it when
/// email confirmation is off.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Wrapped { user: GoTrueUser },
    Bare(GoTrueUser),
}

impl From<SignupResponse> for User {
    fn from(response: SignupResponse) -> Self {
        match response {
            SignupResponse::Wrapped { user } | SignupResponse::Bare(user) => user.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: GoTrueUser,
}

impl TokenResponse {
    fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
    }

    /// Splits a grant into the cached session and the user it belongs to.
    fn into_session(self, session_id: SessionId, now: DateTime<Utc>) -> (StoredSession, User) {
        let expires_at = self.expiry(now);
        let stored = StoredSession {
            provider: PROVIDER.to_string(),
            session_id,
            user_id: UserId::new(self.user.id.clone()),
            secret: self.access_token,
            expires_at,
            refresh_token: self.refresh_token.filter(|token| !token.is_empty()),
        };
        (stored, self.user.into())
    }
}

#[derive(Debug, Deserialize)]
struct PostRow {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    updated_at: Option<DateTime<Utc>>,
    title: String,
    content: String,
    #[serde(deserialize_with = "string_or_number")]
    author_id: String,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    published: Option<bool>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            title: row.title,
            content: row.content,
            image: row
                .image_url
                .filter(|url| !url.is_empty())
                .map(ImageRef::Url),
            author_id: UserId::new(row.author_id),
            author_name: row.author_name.unwrap_or_default(),
            published: row.published.unwrap_or(true),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    bio: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: UserId::new(row.id),
            name: row.name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            bio: row.bio,
        }
    }
}

fn image_url(image: &ImageRef) -> AppResult<&str> {
    match image {
        ImageRef::Url(url) => Ok(url),
        ImageRef::File(_) => Err(AppError::Validation(
            "Supabase posts reference images by URL".to_string(),
        )),
    }
}

/// PostgREST equality filter.
fn eq(value: &str) -> String {
    format!("eq.{value}")
}

// ----------------------------------------------------------------------------
// Backend
// ----------------------------------------------------------------------------

/// Backend over the Supabase REST APIs.
pub struct SupabaseBackend {
    client: reqwest::Client,
    url: String,
    anon_key: String,
    resources: ResourceNames,
    cache: Arc<dyn SessionCache>,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SupabaseBackend {
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
            url: config.supabase.url.trim_end_matches('/').to_string(),
            anon_key: config.supabase.anon_key.trim().to_string(),
            resources: config.resources.clone(),
            cache,
        }
    }

    /// Public URL of an object in the image bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url,
            self.resources.bucket,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.url))
            .header("apikey", &self.anon_key)
    }

    /// The cached session, renewed through GoTrue once its access token
    /// has expired.
    async fn usable_session(&self) -> AppResult<Option<StoredSession>> {
        let Some(stored) = self.cache.load().await? else {
            return Ok(None);
        };
        if stored.provider != PROVIDER {
            return Ok(None);
        }
        if !stored.is_expired(Utc::now()) {
            return Ok(Some(stored));
        }
        match stored.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(stored.session_id.clone(), refresh_token).await,
            None => Ok(None),
        }
    }

    /// Trades a refresh token for a new access token, keeping the session id.
    /// A rejected refresh token signs the user out locally.
    async fn refresh(
        &self,
        session_id: SessionId,
        refresh_token: &str,
    ) -> AppResult<Option<StoredSession>> {
        let response = Self::send(
            self.request(Method::POST, "/auth/v1/token")
                .query(&[("grant_type", "refresh_token")])
                .json(&json!({ "refresh_token": refresh_token })),
            "refresh session",
        )
        .await?;

        if response.status().is_client_error() {
            debug!(status = %response.status(), "refresh token rejected");
            self.cache.clear().await?;
            return Ok(None);
        }
        let token: TokenResponse = read_json(response, "refresh session").await?;
        let (stored, _) = token.into_session(session_id, Utc::now());
        self.cache.store(&stored).await?;
        debug!(session_id = %stored.session_id, "Supabase session refreshed");
        Ok(Some(stored))
    }

    /// Request authorized as the signed-in user, or as `anon` without one.
    async fn authed(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let token = self
            .usable_session()
            .await?
            .map_or_else(|| self.anon_key.clone(), |session| session.secret);
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn send(builder: RequestBuilder, operation: &str) -> AppResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| transport_error(&e, operation))
    }

    fn table_path(table: &str) -> String {
        format!("/rest/v1/{table}")
    }

    fn posts_path(&self) -> String {
        Self::table_path(&self.resources.posts_collection)
    }

    /// Object path for a new upload: random name, original extension.
    fn object_path(upload: &ImageUpload) -> String {
        let name = Uuid::new_v4();
        match upload.extension() {
            Some(ext) => format!("{name}.{ext}"),
            None => name.to_string(),
        }
    }

    /// First row of a representation, or `NotFound` when nothing matched.
    async fn single_row<T: serde::de::DeserializeOwned>(
        response: Response,
        operation: &str,
        id: &PostId,
    ) -> AppResult<T> {
        let rows: Vec<T> = read_json(response, operation).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn register(&self, account: &NewAccount) -> AppResult<User> {
        let body = json!({
            "email": account.email.trim(),
            "password": account.password,
            "data": { "name": account.name.trim() },
        });
        let response = Self::send(
            self.request(Method::POST, "/auth/v1/signup").json(&body),
            "sign up",
        )
        .await?;
        read_json::<SignupResponse>(response, "sign up")
            .await
            .map(User::from)
    }

    async fn open_session(&self, credentials: &Credentials) -> AppResult<Session> {
        let body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
        });
        let response = Self::send(
            self.request(Method::POST, "/auth/v1/token")
                .query(&[("grant_type", "password")])
                .json(&body),
            "sign in",
        )
        .await?;

        // GoTrue answers bad credentials with 400 invalid_grant.
        if response.status() == StatusCode::BAD_REQUEST {
            let message = status_error(response, "sign in").await.message().to_string();
            return Err(AppError::Unauthorized(message));
        }
        let token: TokenResponse = read_json(response, "sign in").await?;

        let (stored, user) = token.into_session(SessionId::unique(), Utc::now());
        self.cache.store(&stored).await?;

        Ok(Session {
            id: stored.session_id,
            user,
            expires_at: stored.expires_at,
        })
    }

    async fn close_sessions(&self) -> AppResult<()> {
        let session = self
            .usable_session()
            .await?
            .ok_or_else(|| AppError::Unauthorized("no active session".to_string()))?;

        let response = Self::send(
            self.request(Method::POST, "/auth/v1/logout")
                .query(&[("scope", "global")])
                .bearer_auth(&session.secret),
            "sign out",
        )
        .await;
        self.cache.clear().await?;
        expect_success(response?, "sign out").await
    }

    async fn current_account(&self) -> AppResult<Option<User>> {
        let Some(session) = self.usable_session().await? else {
            return Ok(None);
        };

        let response = Self::send(
            self.request(Method::GET, "/auth/v1/user")
                .bearer_auth(&session.secret),
            "get user",
        )
        .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!("cached Supabase session was rejected");
            self.cache.clear().await?;
            return Ok(None);
        }
        read_json::<GoTrueUser>(response, "get user")
            .await
            .map(|user| Some(user.into()))
    }

    async fn find_profile(&self, user_id: &UserId) -> AppResult<Option<Profile>> {
        let path = Self::table_path(&self.resources.profiles_table);
        let request = self
            .authed(Method::GET, &path)
            .await?
            .query(&[("select", "*".to_string()), ("id", eq(user_id.as_str()))]);
        let response = Self::send(request, "find profile").await?;
        let rows: Vec<ProfileRow> = read_json(response, "find profile").await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<Profile> {
        let path = Self::table_path(&self.resources.profiles_table);
        let body = json!({
            "id": profile.user_id,
            "name": profile.name,
            "email": profile.email,
            "bio": profile.bio,
        });
        let request = self
            .authed(Method::POST, &path)
            .await?
            .header("Prefer", PREFER_UPSERT)
            .json(&body);
        let response = Self::send(request, "save profile").await?;
        let rows: Vec<ProfileRow> = read_json(response, "save profile").await?;
        rows.into_iter().next().map(Profile::from).ok_or_else(|| {
            AppError::ExternalService("profile upsert returned no row".to_string())
        })
    }

    async fn list_posts(&self, query: &PostQuery) -> AppResult<Vec<Post>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(author_id) = &query.author_id {
            params.push(("author_id", eq(author_id.as_str())));
        }

        let request = self
            .authed(Method::GET, &self.posts_path())
            .await?
            .query(&params);
        let response = Self::send(request, "list posts").await?;
        let rows: Vec<PostRow> = read_json(response, "list posts").await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn find_post(&self, id: &PostId) -> AppResult<Option<Post>> {
        let request = self
            .authed(Method::GET, &self.posts_path())
            .await?
            .query(&[("select", "*".to_string()), ("id", eq(id.as_str()))]);
        let response = Self::send(request, "get post").await?;
        let rows: Vec<PostRow> = read_json(response, "get post").await?;
        Ok(rows.into_iter().next().map(Post::from))
    }

    async fn insert_post(&self, post: &NewPost) -> AppResult<Post> {
        let image = post.image.as_ref().map(image_url).transpose()?;
        let body = json!({
            "title": post.title,
            "content": post.content,
            "author_id": post.author_id,
            "author_name": post.author_name,
            "image_url": image,
            "published": true,
        });
        let request = self
            .authed(Method::POST, &self.posts_path())
            .await?
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&body);
        let response = Self::send(request, "create post").await?;
        let rows: Vec<PostRow> = read_json(response, "create post").await?;
        rows.into_iter()
            .next()
            .map(Post::from)
            .ok_or_else(|| AppError::ExternalService("insert returned no row".to_string()))
    }

    async fn patch_post(&self, id: &PostId, patch: &PostPatch) -> AppResult<Post> {
        let mut body = Map::new();
        if let Some(title) = &patch.title {
            body.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(content) = &patch.content {
            body.insert("content".into(), Value::from(content.as_str()));
        }
        if let Some(image) = &patch.image {
            body.insert("image_url".into(), Value::from(image_url(image)?));
        }
        if let Some(published) = patch.published {
            body.insert("published".into(), Value::from(published));
        }

        let request = self
            .authed(Method::PATCH, &self.posts_path())
            .await?
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&body);
        let response = Self::send(request, "update post").await?;
        Self::single_row::<PostRow>(response, "update post", id)
            .await
            .map(Post::from)
    }

    async fn remove_post(&self, id: &PostId) -> AppResult<()> {
        let request = self
            .authed(Method::DELETE, &self.posts_path())
            .await?
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", PREFER_REPRESENTATION);
        let response = Self::send(request, "delete post").await?;
        Self::single_row::<Value>(response, "delete post", id)
            .await
            .map(|_| ())
    }

    async fn store_image(&self, upload: &ImageUpload) -> AppResult<ImageRef> {
        let object = Self::object_path(upload);
        let path = format!("/storage/v1/object/{}/{object}", self.resources.bucket);
        let request = self
            .authed(Method::POST, &path)
            .await?
            .header(CONTENT_TYPE, &upload.content_type)
            .body(upload.bytes.clone());
        let response = Self::send(request, "upload image").await?;
        expect_success(response, "upload image").await?;
        Ok(ImageRef::Url(self.public_url(&object)))
    }

    async fn image_url(&self, image: &ImageRef) -> AppResult<String> {
        Ok(match image {
            ImageRef::Url(url) => url.clone(),
            ImageRef::File(path) => self.public_url(path.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use quill_core::session::MemorySessionCache;
    use rstest::rstest;

    fn backend(cache: Arc<MemorySessionCache>) -> SupabaseBackend {
        let mut config = AppConfig::default();
        config.supabase.url = "https://abc.supabase.co/".to_string();
        config.supabase.anon_key = "anon-key".to_string();
        SupabaseBackend::with_client(reqwest::Client::new(), &config, cache)
    }

    fn stored(secret: &str) -> StoredSession {
        StoredSession {
            provider: PROVIDER.to_string(),
            session_id: SessionId::new("s1"),
            user_id: UserId::new("u1"),
            secret: secret.to_string(),
            expires_at: None,
            refresh_token: None,
        }
    }

    #[tokio::test]
    async fn test_anonymous_requests_use_anon_key() {
        let backend = backend(Arc::new(MemorySessionCache::new()));
        let request = backend
            .authed(Method::GET, "/rest/v1/posts")
            .await
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "https://abc.supabase.co/rest/v1/posts");
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
    }

    #[tokio::test]
    async fn test_signed_in_requests_use_access_token() {
        let cache = Arc::new(MemorySessionCache::new());
        cache.store(&stored("user-jwt")).await.unwrap();
        let backend = backend(cache);

        let request = backend
            .authed(Method::GET, "/rest/v1/posts")
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer user-jwt");
    }

    #[tokio::test]
    async fn test_other_provider_session_is_ignored() {
        let cache = Arc::new(MemorySessionCache::new());
        let mut session = stored("appwrite-secret");
        session.provider = "appwrite".to_string();
        cache.store(&session).await.unwrap();

        assert!(backend(cache).usable_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_is_anonymous() {
        let cache = Arc::new(MemorySessionCache::new());
        let mut session = stored("old-jwt");
        session.expires_at = Some(Utc::now() - Duration::minutes(5));
        cache.store(&session).await.unwrap();
        let backend = backend(cache);

        assert!(backend.usable_session().await.unwrap().is_none());
        let request = backend
            .authed(Method::GET, "/rest/v1/posts")
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
    }

    #[test]
    fn test_token_grant_keeps_refresh_token() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": { "id": "u1", "email": "alice@example.com" },
        }))
        .unwrap();
        let now = Utc::now();

        let (stored, user) = token.into_session(SessionId::new("s1"), now);
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
        assert_eq!(stored.expires_at, Some(now + Duration::seconds(3600)));
        assert_eq!(user.email, "alice@example.com");
    }

    #[rstest]
    #[case(json!("42"), "42")]
    #[case(json!(42), "42")]
    fn test_post_id_accepts_text_and_numbers(#[case] id: Value, #[case] expected: &str) {
        let row: PostRow = serde_json::from_value(json!({
            "id": id,
            "created_at": "2024-03-01T10:00:00.123456+00:00",
            "title": "Hello",
            "content": "World",
            "author_id": "u1",
        }))
        .unwrap();
        assert_eq!(row.id, expected);
    }

    #[test]
    fn test_post_row_normalization() {
        let row: PostRow = serde_json::from_value(json!({
            "id": 7,
            "created_at": "2024-03-01T10:00:00",
            "updated_at": null,
            "title": "Hello",
            "content": "World",
            "author_id": "u1",
            "author_name": "Alice",
            "image_url": "https://abc.supabase.co/storage/v1/object/public/blog-images/a.png",
            "published": false,
        }))
        .unwrap();

        let post = Post::from(row);
        assert_eq!(post.id.as_str(), "7");
        assert_eq!(post.created_at.year(), 2024);
        assert!(matches!(post.image, Some(ImageRef::Url(_))));
        assert!(!post.published);
    }

    #[test]
    fn test_signup_response_shapes() {
        let bare: SignupResponse = serde_json::from_value(json!({
            "id": "u1",
            "email": "alice@example.com",
            "user_metadata": { "name": "Alice" },
        }))
        .unwrap();
        assert_eq!(User::from(bare).name, "Alice");

        let wrapped: SignupResponse = serde_json::from_value(json!({
            "access_token": "t",
            "user": { "id": "u2", "email": "bob@example.com" },
        }))
        .unwrap();
        let user = User::from(wrapped);
        assert_eq!(user.id.as_str(), "u2");
        assert_eq!(user.name, "");
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "t",
            "expires_in": 3600,
            "user": { "id": "u1" },
        }))
        .unwrap();
        assert_eq!(token.expiry(now), Some(now + Duration::hours(1)));

        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "t",
            "expires_in": 3600,
            "expires_at": 1_704_070_800,
            "user": { "id": "u1" },
        }))
        .unwrap();
        assert_eq!(token.expiry(now), Some(now + Duration::hours(1)));
    }

    #[test]
    fn test_object_path_keeps_extension() {
        let upload = ImageUpload::new("Cover.PNG", "image/png", vec![1]);
        assert!(SupabaseBackend::object_path(&upload).ends_with(".png"));

        let upload = ImageUpload::new("cover", "image/png", vec![1]);
        assert!(!SupabaseBackend::object_path(&upload).contains('.'));
    }

    #[test]
    fn test_public_url() {
        let backend = backend(Arc::new(MemorySessionCache::new()));
        assert_eq!(
            backend.public_url("a.png"),
            "https://abc.supabase.co/storage/v1/object/public/blog-images/a.png"
        );
    }

    #[test]
    fn test_file_images_are_rejected() {
        let err = image_url(&ImageRef::File("f1".into())).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
