//! `SeaORM` entities for the self-hosted provider.

pub mod files;
pub mod posts;
pub mod profiles;
pub mod sessions;
pub mod users;
