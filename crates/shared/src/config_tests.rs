use super::*;

const QUILL_VARS: [&str; 6] = [
    "RUN_MODE",
    "QUILL__PROVIDER",
    "QUILL__APPWRITE__PROJECT_ID",
    "QUILL__SUPABASE__URL",
    "QUILL__SUPABASE__ANON_KEY",
    "QUILL__HTTP__TIMEOUT_SECS",
];

/// Runs `f` with every Quill variable cleared except the given overrides.
fn with_env<F: FnOnce()>(overrides: &[(&str, &str)], f: F) {
    let vars: Vec<(&str, Option<&str>)> = QUILL_VARS
        .iter()
        .map(|key| {
            let value = overrides.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
            (*key, value)
        })
        .collect();
    temp_env::with_vars(vars, f);
}

fn write_settings(dir: &Path, json: &str) {
    std::fs::write(dir.join(SETTINGS_FILE), json).expect("write settings");
}

#[test]
fn test_defaults_point_at_placeholder_project() {
    let dir = tempfile::tempdir().unwrap();
    with_env(&[], || {
        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.provider, ProviderKind::Appwrite);
        assert_eq!(config.appwrite.project_id, PLACEHOLDER_PROJECT_ID);
        assert_eq!(config.appwrite.endpoint, "https://cloud.appwrite.io/v1");
        assert_eq!(config.resources.database_id, "blog-database");
        assert_eq!(config.resources.posts_collection, "posts");
        assert_eq!(config.resources.users_collection, "users");
        assert_eq!(config.resources.bucket, "blog-images");
        assert_eq!(config.settings_dir, dir.path());
        assert_eq!(
            config.readiness(),
            Readiness::NeedsSetup {
                provider: ProviderKind::Appwrite,
                missing: vec!["appwrite.project_id"],
            }
        );
    });
}

#[test]
fn test_settings_file_supplies_project_id() {
    let dir = tempfile::tempdir().unwrap();
    write_settings(dir.path(), r#"{"appwrite": {"project_id": "from-settings"}}"#);

    with_env(&[], || {
        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.appwrite.project_id, "from-settings");
        assert!(config.readiness().is_ready());
    });
}

#[test]
fn test_environment_wins_over_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    write_settings(dir.path(), r#"{"appwrite": {"project_id": "from-settings"}}"#);

    with_env(&[("QUILL__APPWRITE__PROJECT_ID", "from-env")], || {
        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.appwrite.project_id, "from-env");
    });
}

#[test]
fn test_environment_selects_provider_and_numbers() {
    let dir = tempfile::tempdir().unwrap();
    with_env(
        &[
            ("QUILL__PROVIDER", "supabase"),
            ("QUILL__HTTP__TIMEOUT_SECS", "5"),
        ],
        || {
            let config = AppConfig::load_from(dir.path()).unwrap();
            assert_eq!(config.provider, ProviderKind::Supabase);
            assert_eq!(config.http.timeout_secs, 5);
            assert_eq!(
                config.readiness(),
                Readiness::NeedsSetup {
                    provider: ProviderKind::Supabase,
                    missing: vec!["supabase.url", "supabase.anon_key"],
                }
            );
        },
    );
}

#[test]
fn test_supabase_ready_once_both_values_set() {
    let mut config = AppConfig {
        provider: ProviderKind::Supabase,
        ..AppConfig::default()
    };
    config.supabase.url = "https://abc.supabase.co".to_string();
    assert!(!config.readiness().is_ready());

    config.supabase.anon_key = "eyJhbGciOi".to_string();
    assert!(config.readiness().is_ready());
}

#[test]
fn test_blank_project_id_is_not_configured() {
    let mut config = AppConfig::default();
    config.appwrite.project_id = "   ".to_string();
    assert!(!config.readiness().is_ready());
}

#[test]
fn test_local_provider_ready_by_default() {
    let config = AppConfig {
        provider: ProviderKind::Local,
        ..AppConfig::default()
    };
    assert!(config.readiness().is_ready());
}

#[test]
fn test_upload_mime_check_is_case_insensitive() {
    let uploads = UploadConfig::default();
    assert!(uploads.is_mime_type_allowed("image/png"));
    assert!(uploads.is_mime_type_allowed("IMAGE/JPEG"));
    assert!(!uploads.is_mime_type_allowed("application/pdf"));
}
