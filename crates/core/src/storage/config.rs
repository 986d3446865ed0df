//! Where the local provider keeps image bytes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use quill_shared::UploadConfig;

/// OpenDAL service behind the image bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Directory on disk, `local.storage_root` in the configuration.
    LocalFs {
        /// Directory the bucket lives under.
        root: PathBuf,
    },
    /// Process memory; contents vanish with the process.
    Memory,
}

impl StorageProvider {
    /// Disk-backed bucket rooted at `root`.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LocalFs { .. } => "fs",
            Self::Memory => "memory",
        }
    }
}

/// Everything `StorageService` needs to open a bucket.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backing service.
    pub provider: StorageProvider,
    /// Bucket name, also the first segment of every object key.
    pub bucket: String,
    /// Prefix that turns an object key into a public image URL.
    pub public_base_url: String,
    /// Ceiling and allow-list applied before any write.
    pub uploads: UploadConfig,
}

impl StorageConfig {
    /// Bucket used when the configuration names none.
    pub const DEFAULT_BUCKET: &'static str = "blog-images";

    /// Bucket `blog-images` with default upload limits.
    #[must_use]
    pub fn new(provider: StorageProvider, public_base_url: impl Into<String>) -> Self {
        Self {
            provider,
            bucket: Self::DEFAULT_BUCKET.to_owned(),
            public_base_url: public_base_url.into(),
            uploads: UploadConfig::default(),
        }
    }

    /// Replaces the bucket name.
    #[must_use]
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..self
        }
    }

    /// Replaces the upload limits.
    #[must_use]
    pub fn with_uploads(self, uploads: UploadConfig) -> Self {
        Self { uploads, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_blog_images() {
        let config = StorageConfig::new(StorageProvider::Memory, "http://localhost/uploads");
        assert_eq!(config.bucket, "blog-images");
        assert_eq!(config.provider.name(), "memory");
        assert_eq!(
            config.uploads.max_file_size,
            UploadConfig::DEFAULT_MAX_FILE_SIZE
        );
        assert!(config.uploads.is_mime_type_allowed("image/png"));
        assert!(!config.uploads.is_mime_type_allowed("application/pdf"));
    }

    #[test]
    fn test_builders_override_fields() {
        let config = StorageConfig::new(StorageProvider::local_fs("./uploads"), "http://x")
            .with_bucket("covers");
        assert_eq!(config.bucket, "covers");
        assert_eq!(config.provider.name(), "fs");
    }

    #[test]
    fn test_provider_is_tagged_by_type() {
        let provider: StorageProvider =
            serde_json::from_str(r#"{"type":"local_fs","root":"/tmp/quill"}"#).unwrap();
        assert!(matches!(provider, StorageProvider::LocalFs { .. }));
    }
}
