//! Credential hashing for the self-hosted provider.

use argon2::Argon2;
use argon2::password_hash::{
    self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use thiserror::Error;

/// Why a credential could not be hashed or checked.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Argon2 refused to produce a hash.
    #[error("could not hash credential: {0}")]
    HashError(String),

    /// Argon2 failed for a reason other than a wrong password.
    #[error("could not check credential: {0}")]
    VerifyError(String),

    /// The stored value is not a PHC string.
    #[error("stored credential is not a valid PHC string")]
    InvalidHash,
}

fn hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Produces an Argon2id PHC string for `password`, salted per call.
///
/// # Errors
///
/// `HashError` when Argon2 rejects the input.
///
/// ```
/// let phc = quill_core::auth::hash_password("correct horse").unwrap();
/// assert!(phc.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a PHC string from the users table.
///
/// A wrong password is `Ok(false)`.
///
/// # Errors
///
/// `InvalidHash` for a malformed PHC string, `VerifyError` for any other
/// Argon2 failure.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let stored = PasswordHash::new(phc).map_err(|_| PasswordError::InvalidHash)?;
    match hasher().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(other) => Err(PasswordError::VerifyError(other.to_string())),
    }
}
