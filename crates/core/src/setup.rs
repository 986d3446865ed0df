//! First-run setup.
//!
//! When [`AppConfig::readiness`] reports `NeedsSetup`, the composition root
//! shows a [`SetupGuide`] instead of talking to the provider. Values entered
//! during setup are persisted with [`LocalSettings`] and picked up by the next
//! [`AppConfig::load`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use quill_shared::config::{
    PLACEHOLDER_PROJECT_ID, PLACEHOLDER_SUPABASE_KEY, PLACEHOLDER_SUPABASE_URL, SETTINGS_FILE,
};
use quill_shared::{AppConfig, AppError, AppResult, ProviderKind, Readiness};

/// Provisioning instructions for the selected provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupGuide {
    /// Provider being configured.
    pub provider: ProviderKind,
    /// Settings that still hold placeholders or are empty.
    pub missing: Vec<&'static str>,
    /// Steps, in order.
    pub steps: Vec<String>,
}

impl SetupGuide {
    /// Builds the guide for the provider selected in `config`.
    #[must_use]
    pub fn for_config(config: &AppConfig) -> Self {
        let missing = match config.readiness() {
            Readiness::Ready => Vec::new(),
            Readiness::NeedsSetup { missing, .. } => missing,
        };
        let names = &config.resources;

        let steps = match config.provider {
            ProviderKind::Appwrite => vec![
                "Create a new project in the Appwrite console".to_string(),
                format!("Create a database with ID '{}'", names.database_id),
                format!(
                    "Create two collections: '{}' (title, content, authorId, authorName, imageId, published) and '{}' (userId, name, email, bio)",
                    names.posts_collection, names.users_collection
                ),
                format!("Create a storage bucket named '{}'", names.bucket),
                "Copy your project ID from the Appwrite console".to_string(),
                "Save it with `quill setup --project-id <ID>` or set QUILL__APPWRITE__PROJECT_ID"
                    .to_string(),
            ],
            ProviderKind::Supabase => vec![
                "Create a new project in the Supabase dashboard".to_string(),
                format!(
                    "Create the tables '{}' (id, title, content, author_id, author_name, image_url, published, created_at) and '{}' (id, name, email, bio)",
                    names.posts_collection, names.profiles_table
                ),
                format!("Create a public storage bucket named '{}'", names.bucket),
                "Copy the project URL and anon key from the API settings".to_string(),
                "Save them with `quill setup --supabase-url <URL> --supabase-key <KEY>` or set QUILL__SUPABASE__URL and QUILL__SUPABASE__ANON_KEY"
                    .to_string(),
            ],
            ProviderKind::Local => vec![
                "Set QUILL__LOCAL__DATABASE_URL to a SQLite or Postgres URL".to_string(),
                "Run `migrator up` to create the schema".to_string(),
                format!(
                    "Images are written under '{}'",
                    config.local.storage_root.display()
                ),
            ],
        };

        Self {
            provider: config.provider,
            missing,
            steps,
        }
    }

    /// True when nothing is left to configure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for SetupGuide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configure your {} project", self.provider)?;
        if !self.missing.is_empty() {
            writeln!(f, "Missing settings: {}", self.missing.join(", "))?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {step}", i + 1)?;
        }
        Ok(())
    }
}

/// Settings persisted on this machine, merged into configuration on load.
#[derive(Debug, Clone)]
pub struct LocalSettings {
    path: PathBuf,
}

impl LocalSettings {
    /// Uses the settings file inside `settings_dir`.
    #[must_use]
    pub fn in_dir(settings_dir: &Path) -> Self {
        Self {
            path: settings_dir.join(SETTINGS_FILE),
        }
    }

    /// Location of the settings file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored settings; an absent file is an empty object.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the file exists but cannot be read or parsed.
    pub fn load(&self) -> AppResult<Value> {
        match std::fs::read(&self.path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                AppError::Internal(format!("settings file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Value::Object(Map::new()))
            }
            Err(e) => Err(AppError::Internal(format!(
                "settings file {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Merges `values` into the stored settings and writes them back.
    ///
    /// Objects merge key by key; any other value replaces what was there.
    ///
    /// # Errors
    ///
    /// Returns `Internal` on I/O or encoding failures.
    pub fn save(&self, values: Value) -> AppResult<()> {
        let mut current = self.load()?;
        merge(&mut current, values);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(format!("settings dir {}: {e}", parent.display()))
            })?;
        }
        let raw = serde_json::to_vec_pretty(&current)
            .map_err(|e| AppError::Internal(format!("encoding settings: {e}")))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            AppError::Internal(format!("settings file {}: {e}", self.path.display()))
        })?;

        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Stores the Appwrite project ID.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or placeholder ID.
    pub fn save_project_id(&self, project_id: &str) -> AppResult<()> {
        let project_id = project_id.trim();
        if project_id.is_empty() || project_id == PLACEHOLDER_PROJECT_ID {
            return Err(AppError::Validation("project ID is required".to_string()));
        }
        self.save(serde_json::json!({
            "provider": ProviderKind::Appwrite.to_string(),
            "appwrite": { "project_id": project_id },
        }))
    }

    /// Stores the Supabase project URL and anon key.
    ///
    /// # Errors
    ///
    /// `Validation` for empty or placeholder values.
    pub fn save_supabase(&self, url: &str, anon_key: &str) -> AppResult<()> {
        let (url, anon_key) = (url.trim(), anon_key.trim());
        if url.is_empty() || url == PLACEHOLDER_SUPABASE_URL {
            return Err(AppError::Validation("Supabase URL is required".to_string()));
        }
        if anon_key.is_empty() || anon_key == PLACEHOLDER_SUPABASE_KEY {
            return Err(AppError::Validation("Supabase anon key is required".to_string()));
        }
        self.save(serde_json::json!({
            "provider": ProviderKind::Supabase.to_string(),
            "supabase": { "url": url, "anon_key": anon_key },
        }))
    }
}

fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appwrite_guide_names_resources() {
        let guide = SetupGuide::for_config(&AppConfig::default());
        let text = guide.to_string();

        assert_eq!(guide.provider, ProviderKind::Appwrite);
        assert!(!guide.is_complete());
        assert!(text.contains("blog-database"));
        assert!(text.contains("'posts'"));
        assert!(text.contains("'users'"));
        assert!(text.contains("blog-images"));
        assert!(text.contains("appwrite.project_id"));
    }

    #[test]
    fn test_supabase_guide() {
        let config = AppConfig {
            provider: ProviderKind::Supabase,
            ..AppConfig::default()
        };
        let guide = SetupGuide::for_config(&config);
        assert!(guide.to_string().contains("'profiles'"));
        assert!(!guide.is_complete());
    }

    #[test]
    fn test_save_project_id_merges_with_existing_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LocalSettings::in_dir(dir.path());
        settings
            .save(json!({ "appwrite": { "endpoint": "https://appwrite.example.com/v1" } }))
            .unwrap();

        settings.save_project_id("  proj-123 ").unwrap();

        let stored = settings.load().unwrap();
        assert_eq!(stored["appwrite"]["project_id"], "proj-123");
        assert_eq!(stored["appwrite"]["endpoint"], "https://appwrite.example.com/v1");
        assert_eq!(stored["provider"], "appwrite");
    }

    #[test]
    fn test_saved_project_id_makes_config_ready() {
        let dir = tempfile::tempdir().unwrap();
        LocalSettings::in_dir(dir.path())
            .save_project_id("proj-123")
            .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.appwrite.project_id, "proj-123");
        assert!(config.readiness().is_ready());
    }

    #[test]
    fn test_placeholder_project_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LocalSettings::in_dir(dir.path());

        assert!(settings.save_project_id(PLACEHOLDER_PROJECT_ID).is_err());
        assert!(settings.save_project_id("").is_err());
        assert!(!settings.path().exists());
    }

    #[test]
    fn test_save_supabase_requires_both_values() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LocalSettings::in_dir(dir.path());

        assert!(settings.save_supabase("https://abc.supabase.co", "").is_err());
        settings
            .save_supabase("https://abc.supabase.co", "anon")
            .unwrap();
        assert_eq!(settings.load().unwrap()["supabase"]["anon_key"], "anon");
    }

    #[test]
    fn test_merge_replaces_scalars() {
        let mut base = json!({ "a": { "b": 1, "c": 2 }, "d": 3 });
        merge(&mut base, json!({ "a": { "b": 10 }, "d": { "e": 4 } }));
        assert_eq!(base, json!({ "a": { "b": 10, "c": 2 }, "d": { "e": 4 } }));
    }
}
