//! Shared identifiers, errors, and configuration for Quill.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for provider-opaque entity references
//! - Application-wide error types
//! - Configuration management and the setup gate
//! - JWT session tokens for the self-hosted provider

pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::{AppConfig, ProviderKind, Readiness, UploadConfig};
pub use error::{AppError, AppResult};
pub use jwt::{IssuedToken, JwtConfig, JwtError, JwtService, SessionClaims};
