//! Application configuration management.
//!
//! Sources, lowest precedence first: serde defaults, `config/default`,
//! `config/{RUN_MODE}`, the local settings file written by the setup flow,
//! and `QUILL__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::jwt::JwtConfig;

/// Project ID shipped in the default configuration. Means "not set up yet".
pub const PLACEHOLDER_PROJECT_ID: &str = "your-project-id";
/// Supabase URL shipped in the default configuration.
pub const PLACEHOLDER_SUPABASE_URL: &str = "https://your-project.supabase.co";
/// Supabase anon key shipped in the default configuration.
pub const PLACEHOLDER_SUPABASE_KEY: &str = "your-anon-key";

/// Directory holding local settings and the session cache.
pub const DEFAULT_SETTINGS_DIR: &str = ".quill";
/// Settings file name inside the settings directory.
pub const SETTINGS_FILE: &str = "settings.json";
/// Environment variable that relocates the settings directory.
pub const SETTINGS_DIR_ENV: &str = "QUILL_SETTINGS_DIR";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Which backend implementation to bind at startup.
    #[serde(default)]
    pub provider: ProviderKind,
    /// Appwrite provider settings.
    #[serde(default)]
    pub appwrite: AppwriteConfig,
    /// Supabase provider settings.
    #[serde(default)]
    pub supabase: SupabaseConfig,
    /// Self-hosted provider settings.
    #[serde(default)]
    pub local: LocalConfig,
    /// Resource names provisioned on the backend.
    #[serde(default)]
    pub resources: ResourceNames,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Session token settings for the self-hosted provider.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Image upload limits.
    #[serde(default)]
    pub uploads: UploadConfig,
    /// Write coalescing settings.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Directory holding local settings and the session cache.
    #[serde(default = "default_settings_dir")]
    pub settings_dir: PathBuf,
}

fn default_settings_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SETTINGS_DIR)
}

/// Backend provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Appwrite: account API, document collections, file-id storage.
    #[default]
    Appwrite,
    /// Supabase: GoTrue auth, PostgREST tables, public-URL storage.
    Supabase,
    /// Self-hosted: SQL database plus object storage.
    Local,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Appwrite => write!(f, "appwrite"),
            Self::Supabase => write!(f, "supabase"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Appwrite configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteConfig {
    /// API endpoint, including the version segment.
    #[serde(default = "default_appwrite_endpoint")]
    pub endpoint: String,
    /// Project ID sent on every request.
    #[serde(default = "default_project_id")]
    pub project_id: String,
}

fn default_appwrite_endpoint() -> String {
    "https://cloud.appwrite.io/v1".to_string()
}

fn default_project_id() -> String {
    PLACEHOLDER_PROJECT_ID.to_string()
}

impl Default for AppwriteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_appwrite_endpoint(),
            project_id: default_project_id(),
        }
    }
}

/// Supabase configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL.
    #[serde(default = "default_supabase_url")]
    pub url: String,
    /// Public anon key.
    #[serde(default = "default_supabase_key")]
    pub anon_key: String,
}

fn default_supabase_url() -> String {
    PLACEHOLDER_SUPABASE_URL.to_string()
}

fn default_supabase_key() -> String {
    PLACEHOLDER_SUPABASE_KEY.to_string()
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: default_supabase_url(),
            anon_key: default_supabase_key(),
        }
    }
}

/// Self-hosted provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Database connection URL (SQLite or Postgres).
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Root directory for stored images.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// URL prefix under which stored images are served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_database_url() -> String {
    "sqlite://.quill/quill.db?mode=rwc".to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".quill/uploads")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/uploads".to_string()
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            storage_root: default_storage_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Resource names that must match what is provisioned on the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceNames {
    /// Appwrite database ID.
    #[serde(default = "default_database_id")]
    pub database_id: String,
    /// Posts collection (Appwrite) or table (Supabase, local).
    #[serde(default = "default_posts_collection")]
    pub posts_collection: String,
    /// Appwrite collection holding user profiles.
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
    /// Supabase table holding user profiles.
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
    /// Storage bucket for post images.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_database_id() -> String {
    "blog-database".to_string()
}

fn default_posts_collection() -> String {
    "posts".to_string()
}

fn default_users_collection() -> String {
    "users".to_string()
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_bucket() -> String {
    "blog-images".to_string()
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            database_id: default_database_id(),
            posts_collection: default_posts_collection(),
            users_collection: default_users_collection(),
            profiles_table: default_profiles_table(),
            bucket: default_bucket(),
        }
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Image upload limits.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types for upload.
    #[serde(default = "default_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_max_file_size() -> u64 {
    UploadConfig::DEFAULT_MAX_FILE_SIZE
}

fn default_mime_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_mime_types: default_mime_types(),
        }
    }
}

/// Idempotent write coalescing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencyConfig {
    /// How long a completed keyed write is remembered, in seconds.
    #[serde(default = "default_idempotency_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of remembered keys.
    #[serde(default = "default_idempotency_capacity")]
    pub capacity: u64,
}

fn default_idempotency_ttl() -> u64 {
    600
}

fn default_idempotency_capacity() -> u64 {
    1_000
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_idempotency_ttl(),
            capacity: default_idempotency_capacity(),
        }
    }
}

/// Outcome of the setup gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The selected provider has usable settings.
    Ready,
    /// The selected provider still has placeholder or empty settings.
    NeedsSetup {
        /// Provider that needs configuring.
        provider: ProviderKind,
        /// Dotted keys that must be supplied.
        missing: Vec<&'static str>,
    },
}

impl Readiness {
    /// True when the application may talk to its provider.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

fn unset(value: &str, placeholder: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == placeholder
}

impl AppConfig {
    /// Loads configuration from environment, config files and local settings.
    ///
    /// The settings directory comes from `QUILL_SETTINGS_DIR`, falling back
    /// to `.quill`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings_dir = std::env::var(SETTINGS_DIR_ENV)
            .map_or_else(|_| default_settings_dir(), PathBuf::from);
        Self::load_from(&settings_dir)
    }

    /// Loads configuration using an explicit settings directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed.
    pub fn load_from(settings_dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let settings_file = settings_dir.join(SETTINGS_FILE);

        let config = config::Config::builder()
            .set_default("settings_dir", settings_dir.to_string_lossy().to_string())?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::File::from(settings_file)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("QUILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Path of the local settings file.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.settings_dir.join(SETTINGS_FILE)
    }

    /// Checks whether the selected provider is configured.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        let mut missing = Vec::new();
        match self.provider {
            ProviderKind::Appwrite => {
                if unset(&self.appwrite.project_id, PLACEHOLDER_PROJECT_ID) {
                    missing.push("appwrite.project_id");
                }
                if self.appwrite.endpoint.trim().is_empty() {
                    missing.push("appwrite.endpoint");
                }
            }
            ProviderKind::Supabase => {
                if unset(&self.supabase.url, PLACEHOLDER_SUPABASE_URL) {
                    missing.push("supabase.url");
                }
                if unset(&self.supabase.anon_key, PLACEHOLDER_SUPABASE_KEY) {
                    missing.push("supabase.anon_key");
                }
            }
            ProviderKind::Local => {
                if self.local.database_url.trim().is_empty() {
                    missing.push("local.database_url");
                }
            }
        }

        if missing.is_empty() {
            Readiness::Ready
        } else {
            Readiness::NeedsSetup {
                provider: self.provider,
                missing,
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            appwrite: AppwriteConfig::default(),
            supabase: SupabaseConfig::default(),
            local: LocalConfig::default(),
            resources: ResourceNames::default(),
            http: HttpConfig::default(),
            jwt: JwtConfig::default(),
            uploads: UploadConfig::default(),
            idempotency: IdempotencyConfig::default(),
            settings_dir: default_settings_dir(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
