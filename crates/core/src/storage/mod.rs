//! Image bucket backed by Apache OpenDAL.
//!
//! Used by the self-hosted provider; hosted providers bring their own
//! storage. The bucket lives on disk, or in memory for tests.
//!
//! Keys have the form `{bucket}/{file_id}/{sanitized_filename}` and are
//! served under the configured public base URL.

mod config;
mod error;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{ObjectMetadata, StorageService, StoredObject};
