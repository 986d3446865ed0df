//! Password hashing for providers that store credentials themselves.
//!
//! Hosted providers hash on their side; only the self-hosted provider calls
//! into this module.

mod password;

pub use password::{PasswordError, hash_password, verify_password};

use quill_shared::AppError;

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}
