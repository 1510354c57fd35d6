//! Integration tests for configuration discovery and validation.

use std::fs;

use tempfile::TempDir;

use koboswitch::config::Settings;
use koboswitch::error::SwitchError;

use crate::common::init_test_logging;

#[test]
fn explicit_file_overrides_defaults() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("koboswitch.toml");
    fs::write(
        &path,
        "user_table = \"account\"\nrestore_ignore = [\".kobo\", \"*.log\"]\n",
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).unwrap();

    assert_eq!(settings.user_table, "account");
    assert_eq!(settings.restore_ignore, vec![".kobo", "*.log"]);
    assert_eq!(settings.database_name, "KoboReader.sqlite");
    assert!(settings.preserve_symlinks);
}

#[test]
fn missing_explicit_file_is_an_error() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, SwitchError::ConfigNotFound { .. }));
}

#[test]
fn invalid_pattern_is_rejected() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "restore_ignore = [\"[unclosed\"]\n").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();
    assert!(matches!(err, SwitchError::InvalidPattern { .. }), "{err}");
}

#[cfg(target_os = "linux")]
#[test]
fn default_location_is_used_when_present() {
    use crate::common::env::with_config_home;
    use koboswitch::config::default_config_path;

    init_test_logging();
    let home = TempDir::new().unwrap();
    let home_str = home.path().display().to_string();
    let _guard = with_config_home(&home_str);

    // Absent file: defaults.
    assert_eq!(Settings::load(None).unwrap(), Settings::default());

    let path = default_config_path().unwrap();
    assert!(path.starts_with(home.path()));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "preserve_symlinks = false\n").unwrap();

    let settings = Settings::load(None).unwrap();
    assert!(!settings.preserve_symlinks);
}
