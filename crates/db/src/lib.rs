//! Self-hosted Quill provider.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - `LocalBackend`, the `Backend` implementation over them

pub mod backend;
pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use backend::LocalBackend;
pub use error::map_db_err;
pub use repositories::{
    FileRepository, PostRepository, ProfileRepository, SessionRepository, UserRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use quill_shared::{AppError, AppResult};

/// Establishes a connection to the database.
///
/// File-backed SQLite URLs get their parent directory created first.
///
/// # Errors
///
/// Returns `Database` if the connection cannot be established.
pub async fn connect(database_url: &str) -> AppResult<DatabaseConnection> {
    ensure_sqlite_parent(database_url).await?;

    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    let db = Database::connect(options).await.map_err(map_db_err)?;

    info!(database = %redact_url(database_url), "connected to database");
    Ok(db)
}

/// Creates the directory of a file-backed SQLite URL.
async fn ensure_sqlite_parent(url: &str) -> AppResult<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Database(format!("{}: {e}", parent.display())))?;
    }
    Ok(())
}

/// Drops credentials from a connection URL before logging it.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}
