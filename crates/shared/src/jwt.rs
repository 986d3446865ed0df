//! Signed session secrets for the self-hosted provider.
//!
//! Used by the self-hosted provider, which has no hosted auth service to hand
//! out session secrets.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{SessionId, UserId};

/// `[jwt]` section of the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC key. Override outside development.
    #[serde(default = "default_secret")]
    pub secret: String,
    /// How long a sign-in lasts, in seconds.
    #[serde(default = "default_session_expiry")]
    pub session_expiry_secs: i64,
}

fn default_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_session_expiry() -> i64 {
    1_209_600 // 14 days
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            session_expiry_secs: default_session_expiry(),
        }
    }
}

/// Payload of a session secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Signed-in user.
    pub sub: String,
    /// Row in `sessions` that must still be live.
    pub sid: String,
    /// Unix seconds at sign-in.
    pub iat: i64,
    /// Unix seconds after which the secret is refused.
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for a sign-in that lasts until `expires_at`.
    #[must_use]
    pub fn new(user_id: &UserId, session_id: &SessionId, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// The `sub` claim.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }

    /// The `sid` claim.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.sid.clone())
    }
}

/// Why a secret could not be minted or read back.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Signing failed.
    #[error("could not sign session secret: {0}")]
    EncodingError(String),

    /// Bad signature, malformed, or wrong algorithm.
    #[error("session secret rejected: {0}")]
    DecodingError(String),

    /// Past `exp`.
    #[error("session secret has expired")]
    Expired,
}

/// Secret handed to the session cache after sign-in.
#[derive(Clone)]
pub struct IssuedToken {
    /// Compact JWS.
    pub token: String,
    /// Mirrors the `exp` claim.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[hidden]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints and checks session secrets with one HS256 key.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("session_expiry_secs", &self.config.session_expiry_secs)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Derives both keys from `config.secret`.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let key = config.secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            config,
        }
    }

    /// Mints a secret for `session_id`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// `EncodingError` from the signer.
    pub fn issue(&self, user_id: &UserId, session_id: &SessionId) -> Result<IssuedToken, JwtError> {
        let expires_at = Utc::now() + Duration::seconds(self.config.session_expiry_secs);
        encode(
            &Header::default(),
            &SessionClaims::new(user_id, session_id, expires_at),
            &self.encoding_key,
        )
        .map(|token| IssuedToken { token, expires_at })
        .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Reads the claims back out of a cached secret.
    ///
    /// # Errors
    ///
    /// `Expired` past `exp`; `DecodingError` for anything forged or garbled.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    JwtError::Expired
                } else {
                    JwtError::DecodingError(e.to_string())
                }
            })
    }

    /// Configured lifetime in seconds.
    #[must_use]
    pub const fn session_expiry_secs(&self) -> i64 {
        self.config.session_expiry_secs
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
