//! Storage service implementation using Apache OpenDAL.

use bytes::Bytes;
use opendal::{ErrorKind, Operator, services};

use quill_shared::types::FileId;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key.
    pub key: String,
    /// File size in bytes.
    pub size: u64,
    /// URL the object is served under.
    pub public_url: String,
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Storage key.
    pub key: String,
    /// File size in bytes.
    pub size: u64,
}

/// Object storage for post images.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("bucket", &self.config.bucket)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Opens the bucket described by `config`.
    ///
    /// # Errors
    ///
    /// `Configuration` when OpenDAL cannot build the operator.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("storage root is not UTF-8"))?;
                Operator::new(services::Fs::default().root(root)).map(|op| op.finish())
            }
            StorageProvider::Memory => {
                Operator::new(services::Memory::default()).map(|op| op.finish())
            }
        };
        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validate an upload against the configured limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty, too large or of a refused type.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size == 0 {
            return Err(StorageError::Empty);
        }

        let limits = &self.config.uploads;
        if size > limits.max_file_size {
            return Err(StorageError::file_too_large(size, limits.max_file_size));
        }

        if !limits.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }

    /// Generate the storage key for an image.
    ///
    /// Format: `{bucket}/{file_id}/{sanitized_filename}`
    #[must_use]
    pub fn image_key(&self, file_id: &FileId, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.bucket,
            file_id,
            sanitize_filename(filename)
        )
    }

    /// Validate and write an image.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the write fails.
    pub async fn put_image(
        &self,
        file_id: &FileId,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let size = bytes.len() as u64;
        self.validate_upload(content_type, size)?;

        let key = self.image_key(file_id, filename);
        self.operator
            .write(&key, bytes)
            .await
            .map_err(StorageError::from)?;

        Ok(StoredObject {
            public_url: self.public_url(&key),
            key,
            size,
        })
    }

    /// Size of the object at `key`; doubles as an existence check.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing is stored there.
    pub async fn stat(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let meta = self.operator.stat(key).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(key),
            _ => StorageError::from(e),
        })?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: meta.content_length(),
        })
    }

    /// Delete a stored object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// URL under which `key` is served.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        sanitized
    }
}
