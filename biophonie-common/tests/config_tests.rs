//! Configuration resolution and directory creation
//!
//! Tests that change HOME / XDG_CONFIG_HOME are marked #[serial] so they do not
//! race each other.

use biophonie_common::config::{default_root_folder, Config, ConfigOverrides, TomlConfig};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_default_root_folder_for_current_platform() {
    let root = default_root_folder();
    assert!(!root.as_os_str().is_empty());
    assert!(root.to_string_lossy().contains("biophonie"));
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/biophonie"
        snapshot_path = "/var/www/geojson.json"
        bind_addr = "0.0.0.0"

        [geopoint]
        title_max_len = 40

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = Config::resolve(&overrides).unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/srv/biophonie"));
    assert_eq!(config.database_path, PathBuf::from("/srv/biophonie/biophonie.db"));
    assert_eq!(config.snapshot_path, PathBuf::from("/var/www/geojson.json"));
    assert_eq!(config.bind_addr, "0.0.0.0");
    assert_eq!(config.limits.title_max_len, 40);
    assert_eq!(config.limits.title_min_len, 3);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_explicit_config_file_is_error() {
    let overrides = ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/biophonie/config.toml")),
        ..Default::default()
    };
    assert!(Config::resolve(&overrides).is_err());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_user_config_file_is_discovered() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("biophonie");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "port = 9321\n").unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = Config::resolve(&ConfigOverrides::default());

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(config.unwrap().port, 9321);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_missing_default_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let overrides = ConfigOverrides {
        root_folder: Some(dir.path().join("root")),
        ..Default::default()
    };
    let config = Config::resolve(&overrides);

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = config.expect("Missing default config file should not be an error");
    if !PathBuf::from("/etc/biophonie/config.toml").exists() {
        assert_eq!(config.port, 8080);
    }
}

#[test]
fn test_ensure_directories_creates_layout() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_root(dir.path().join("data"));

    config.ensure_directories().unwrap();
    assert!(config.root_folder.is_dir());
    assert!(config.snapshot_path.parent().unwrap().is_dir());
    assert!(config.assets_folder.is_dir());

    // Idempotent
    config.ensure_directories().unwrap();
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config = TomlConfig::parse("legacy_option = true\nport = 8181\n").unwrap();
    assert_eq!(config.port, Some(8181));
}
