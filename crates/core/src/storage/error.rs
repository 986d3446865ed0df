//! Failures of the image bucket.

use thiserror::Error;

use quill_shared::AppError;

/// What went wrong while storing or reading an image.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload is larger than `uploads.max_file_size`.
    #[error("image is {size} bytes, the limit is {max} bytes")]
    FileTooLarge {
        /// Bytes received.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Content type outside `uploads.allowed_types`.
    #[error("content type '{mime_type}' is not an accepted image type")]
    InvalidMimeType {
        /// Declared content type.
        mime_type: String,
    },

    /// Zero-byte upload.
    #[error("image has no content")]
    Empty,

    /// No object under this key.
    #[error("no stored image at {key}")]
    NotFound {
        /// Object key in the bucket.
        key: String,
    },

    /// The OpenDAL operator could not be built.
    #[error("image bucket is misconfigured: {0}")]
    Configuration(String),

    /// Any other OpenDAL failure.
    #[error("image bucket error: {0}")]
    Operation(String),
}

impl StorageError {
    /// Upload over the size ceiling.
    #[must_use]
    pub const fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Disallowed content type.
    #[must_use]
    pub fn invalid_mime_type(mime_type: impl Into<String>) -> Self {
        Self::InvalidMimeType {
            mime_type: mime_type.into(),
        }
    }

    /// Missing object.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Operator construction failure.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Rejections caused by the upload itself rather than the bucket.
    #[must_use]
    pub const fn is_rejected_upload(&self) -> bool {
        matches!(
            self,
            Self::FileTooLarge { .. } | Self::InvalidMimeType { .. } | Self::Empty
        )
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        if err.kind() == opendal::ErrorKind::NotFound {
            Self::not_found(err.to_string())
        } else {
            Self::Operation(err.to_string())
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        if err.is_rejected_upload() {
            Self::Validation(message)
        } else if matches!(err, StorageError::NotFound { .. }) {
            Self::NotFound(message)
        } else {
            Self::Storage(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_rejections_become_validation_errors() {
        for err in [
            StorageError::file_too_large(2, 1),
            StorageError::invalid_mime_type("text/html"),
            StorageError::Empty,
        ] {
            assert!(err.is_rejected_upload());
            assert!(matches!(AppError::from(err), AppError::Validation(_)));
        }
    }

    #[test]
    fn test_bucket_failures_keep_their_kind() {
        assert!(AppError::from(StorageError::not_found("images/a.png")).is_not_found());
        assert!(matches!(
            AppError::from(StorageError::configuration("bad root")),
            AppError::Storage(_)
        ));
    }
}
