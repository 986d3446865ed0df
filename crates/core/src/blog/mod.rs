//! Blog data access.
//!
//! This module implements the provider-neutral blog layer:
//! - Domain types for accounts, posts and images
//! - The `Backend` seam every provider binding implements
//! - Input validation that runs before any provider call
//! - The `Blog` facade the presentation layer talks to

pub mod backend;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod props;

pub use backend::Backend;
#[cfg(test)]
pub use backend::MockBackend;
pub use service::Blog;
pub use types::{
    ANONYMOUS_AUTHOR, Credentials, CurrentUser, DEFAULT_POST_LIMIT, IdempotencyKey, ImageRef,
    ImageUpload, NewAccount, NewPost, Post, PostPatch, PostQuery, Profile, PublishRequest, Session,
    User,
};
pub use validation::MIN_PASSWORD_LENGTH;
