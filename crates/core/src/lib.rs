//! Core blog logic for Quill.
//!
//! This crate holds the provider-agnostic facade and everything it needs that
//! is not tied to a specific provider SDK.
//!
//! # Modules
//!
//! - `blog` - Domain types, the `Backend` seam and the `Blog` facade
//! - `auth` - Password hashing for the self-hosted provider
//! - `session` - Local cache of the provider session secret
//! - `setup` - First-run setup guide and local settings
//! - `storage` - OpenDAL-backed image bucket

pub mod auth;
pub mod blog;
pub mod session;
pub mod setup;
pub mod storage;

pub use blog::{Backend, Blog};
