//! Provider selection.

use std::sync::Arc;

use tracing::info;

use quill_core::Backend;
use quill_core::session::SessionCache;
use quill_db::LocalBackend;
use quill_remote::{AppwriteBackend, SupabaseBackend};
use quill_shared::{AppConfig, AppError, AppResult, ProviderKind, Readiness};

/// Builds the one backend selected by `config.provider`.
///
/// Refuses with `NotConfigured` while the setup gate is closed, before any
/// client is created.
pub async fn build_backend(
    config: &AppConfig,
    cache: Arc<dyn SessionCache>,
) -> AppResult<Arc<dyn Backend>> {
    if let Readiness::NeedsSetup { provider, missing } = config.readiness() {
        return Err(AppError::NotConfigured(format!(
            "{provider} needs {}",
            missing.join(", ")
        )));
    }

    let backend: Arc<dyn Backend> = match config.provider {
        ProviderKind::Appwrite => Arc::new(AppwriteBackend::new(config, cache)?),
        ProviderKind::Supabase => Arc::new(SupabaseBackend::new(config, cache)?),
        ProviderKind::Local => Arc::new(LocalBackend::connect(config, cache).await?),
    };
    info!(provider = backend.name(), "backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::session::MemorySessionCache;

    #[tokio::test]
    async fn test_placeholder_project_is_not_configured() {
        let config = AppConfig::default();
        let err = build_backend(&config, Arc::new(MemorySessionCache::new()))
            .await
            .err().unwrap();
        assert!(
            matches!(err, AppError::NotConfigured(ref m) if m.contains("appwrite.project_id")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_supabase_placeholders_are_not_configured() {
        let mut config = AppConfig::default();
        config.provider = ProviderKind::Supabase;
        let err = build_backend(&config, Arc::new(MemorySessionCache::new()))
            .await
            .err().unwrap();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_configured_appwrite_builds_without_network() {
        let mut config = AppConfig::default();
        config.appwrite.project_id = "proj-1".to_string();
        let backend = build_backend(&config, Arc::new(MemorySessionCache::new()))
            .await
            .unwrap();
        assert_eq!(backend.name(), "appwrite");
    }

    #[tokio::test]
    async fn test_local_provider_migrates_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.provider = ProviderKind::Local;
        config.local.database_url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("quill.db").display()
        );
        config.local.storage_root = dir.path().join("uploads");

        let backend = build_backend(&config, Arc::new(MemorySessionCache::new()))
            .await
            .unwrap();
        assert_eq!(backend.name(), "local");
        assert!(dir.path().join("quill.db").exists());
    }
}
