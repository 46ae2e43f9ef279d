use graycfg_core::Settings;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::load_from_sources(temp_dir.path(), "staging").unwrap();
    assert_eq!(settings.env, "staging");
    assert!(settings.binding.auto_update_injected_properties);
    assert_eq!(settings.cache.max_releases_by_id, 10_000);
}

#[test]
fn test_env_file_overrides_default_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        "[logging]\nlevel = \"debug\"\n\n[cache]\nmax_releases_by_id = 50\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("production.toml"),
        "[cache]\nmax_releases_by_id = 500\n",
    )
    .unwrap();

    let settings = Settings::load_from_sources(temp_dir.path(), "production").unwrap();
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.cache.max_releases_by_id, 500);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_local_file_wins_over_env_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("development.toml"),
        "[binding]\nauto_update_injected_properties = true\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("local.toml"),
        "[binding]\nauto_update_injected_properties = false\n",
    )
    .unwrap();

    let settings = Settings::load_from_sources(temp_dir.path(), "development").unwrap();
    assert!(!settings.binding.auto_update_injected_properties);
}
