//! Blog domain types exposed through the facade.
//!
//! Shapes are provider-neutral; each backend renames provider fields
//! (`$id`, `author_id`, `imageId`, ...) into these.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use quill_shared::types::{FileId, PostId, SessionId, UserId};

/// Number of posts returned when the caller does not ask for a limit.
pub const DEFAULT_POST_LIMIT: u32 = 10;

/// Author name used when neither profile nor account carries one.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account ID.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name; may be empty when the provider stores none.
    pub name: String,
    /// Registration time, when the provider reports it.
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name to print next to authored content.
    ///
    /// Falls back to the email, then to `Anonymous`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.email.trim().is_empty() {
            &self.email
        } else {
            ANONYMOUS_AUTHOR
        }
    }
}

/// A session opened by login or registration.
///
/// The secret itself stays inside the provider binding's session cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Account that owns the session.
    pub user: User,
    /// When the provider will stop honouring the session.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of asking who is signed in.
///
/// Absence of a session is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentUser {
    /// A session is active.
    Authenticated(User),
    /// Nobody is signed in.
    Anonymous,
}

impl CurrentUser {
    /// Returns the signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// Consumes `self`, returning the signed-in user, if any.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// True when a session is active.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl From<Option<User>> for CurrentUser {
    fn from(user: Option<User>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }
}

/// Public profile record created at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account the profile belongs to.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Free-form bio.
    pub bio: Option<String>,
}

/// Reference to a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
    /// Publicly resolvable URL (URL-based providers).
    Url(String),
    /// Opaque file ID that needs a provider lookup (ID-based providers).
    File(FileId),
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(id) => write!(f, "file:{id}"),
        }
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post ID.
    pub id: PostId,
    /// Title.
    pub title: String,
    /// Body text; paragraphs separated by newlines.
    pub content: String,
    /// Optional cover image.
    pub image: Option<ImageRef>,
    /// Author account.
    pub author_id: UserId,
    /// Author display name at publication time.
    pub author_name: String,
    /// Whether the post is visible in the feed.
    pub published: bool,
    /// Creation time; the feed is ordered on this.
    pub created_at: DateTime<Utc>,
    /// Last modification time, when the provider reports it.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    /// True when `user_id` wrote this post. Only drives edit affordances;
    /// the provider is responsible for enforcing ownership.
    #[must_use]
    pub fn is_authored_by(&self, user_id: &UserId) -> bool {
        &self.author_id == user_id
    }
}

/// Registration input.
#[derive(Clone, Deserialize)]
pub struct NewAccount {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub name: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"[hidden]")
            .field("name", &self.name)
            .finish()
    }
}

/// Login input.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[hidden]")
            .finish()
    }
}

impl From<&NewAccount> for Credentials {
    fn from(account: &NewAccount) -> Self {
        Self {
            email: account.email.clone(),
            password: account.password.clone(),
        }
    }
}

/// Fields needed to create a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Author account.
    pub author_id: UserId,
    /// Author display name.
    pub author_name: String,
    /// Optional cover image.
    pub image: Option<ImageRef>,
}

impl NewPost {
    pub(crate) fn fingerprint(&self) -> String {
        let image = self.image.as_ref().map(ToString::to_string).unwrap_or_default();
        digest(&[
            self.title.as_bytes(),
            self.content.as_bytes(),
            self.author_id.as_str().as_bytes(),
            self.author_name.as_bytes(),
            image.as_bytes(),
        ])
    }
}

/// Hex SHA-256 over length-prefixed fields.
fn digest(fields: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.len().to_le_bytes());
        hasher.update(field);
    }
    format!("{:x}", hasher.finalize())
}

/// Partial update of a post's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New cover image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    /// New visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl PostPatch {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.image.is_none()
            && self.published.is_none()
    }

    /// Applies the patch to a post in place.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            post.content.clone_from(content);
        }
        if let Some(image) = &self.image {
            post.image = Some(image.clone());
        }
        if let Some(published) = self.published {
            post.published = published;
        }
    }
}

/// Feed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuery {
    /// Maximum number of posts to return; must be at least 1.
    pub limit: u32,
    /// Restrict to one author.
    pub author_id: Option<UserId>,
}

impl PostQuery {
    /// Latest posts across all authors.
    #[must_use]
    pub const fn latest(limit: u32) -> Self {
        Self {
            limit,
            author_id: None,
        }
    }

    /// Latest posts by one author.
    #[must_use]
    pub const fn by_author(author_id: UserId, limit: u32) -> Self {
        Self {
            limit,
            author_id: Some(author_id),
        }
    }
}

impl Default for PostQuery {
    fn default() -> Self {
        Self::latest(DEFAULT_POST_LIMIT)
    }
}

/// Binary image payload to upload.
#[derive(Clone)]
pub struct ImageUpload {
    /// Original filename; its extension is kept on URL-based providers.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Creates an upload from raw parts.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension of the original filename, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

impl ImageUpload {
    pub(crate) fn fingerprint(&self) -> String {
        digest(&[
            self.filename.as_bytes(),
            self.content_type.as_bytes(),
            &self.bytes[..],
        ])
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Caller-chosen token that makes a write safe to repeat.
///
/// A key names one write of one payload. Writes are remembered under the
/// key together with a digest of their input, so reusing a key with
/// different content performs a new write instead of returning the
/// earlier result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps a caller-provided key.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derives a sub-key for one step of a multi-step flow.
    #[must_use]
    pub fn scoped(&self, step: &str) -> Self {
        Self(format!("{}:{step}", self.0))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Input of the compose-and-publish flow.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Optional cover image to upload first.
    pub image: Option<ImageUpload>,
    /// Makes a repeated submit return the first result.
    pub idempotency_key: Option<IdempotencyKey>,
}
