//! The error every Quill operation reports.

use thiserror::Error;

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

/// Failure of a façade or provider operation.
///
/// `Clone` so coalesced callers can each receive the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Bad credentials, or the operation needs a signed-in user.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Signed in, but not the author.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Post, profile, file or session does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error, raised before any provider call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Email already registered, or a duplicate document ID.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The provider is throttling requests.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The deployment still points at placeholder provider settings.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// SQL failure in the self-hosted provider.
    #[error("Database error: {0}")]
    Database(String),

    /// Image bucket failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport failure or unexpected status from a hosted provider.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Bug or broken invariant inside Quill.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Maps a provider HTTP status and message onto an error variant.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited(message),
            _ => Self::ExternalService(message),
        }
    }

    /// Closest HTTP status, for logs and CLI exit reporting.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::RateLimited(_) => 429,
            Self::NotConfigured(_) => 503,
            Self::Database(_) | Self::Storage(_) | Self::ExternalService(_) | Self::Internal(_) => {
                500
            }
        }
    }

    /// Machine-readable code, stable across releases.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Validation(m)
            | Self::Conflict(m)
            | Self::RateLimited(m)
            | Self::NotConfigured(m)
            | Self::Database(m)
            | Self::Storage(m)
            | Self::ExternalService(m)
            | Self::Internal(m) => m,
        }
    }

    /// True for `NotFound`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<crate::jwt::JwtError> for AppError {
    fn from(err: crate::jwt::JwtError) -> Self {
        match err {
            crate::jwt::JwtError::EncodingError(msg) => Self::Internal(msg),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
