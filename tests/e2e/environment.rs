//! Environment variable behavior end-to-end tests.

use crate::common::cli::CliRunner;
use crate::common::fixtures::{DeviceFixture, user_ids};
use crate::common::init_test_logging;

#[test]
fn format_env_sets_json_output() {
    init_test_logging();
    let cli = CliRunner::new().with_env("KOBOSWITCH_FORMAT", "json");
    let result = cli.run(&["version"]);
    result.assert_success();
    assert!(result.json().get("version").is_some());
}

#[test]
fn format_env_sets_compact_json() {
    init_test_logging();
    let cli = CliRunner::new().with_env("KOBOSWITCH_FORMAT", "json-compact");
    let result = cli.run(&["version"]);
    result.assert_success();

    let stdout = result.stdout.trim_end();
    assert!(result.json().get("version").is_some());
    assert_eq!(stdout.lines().count(), 1, "Expected compact JSON single line");
}

#[test]
fn cli_format_flag_overrides_env() {
    init_test_logging();
    let cli = CliRunner::new().with_env("KOBOSWITCH_FORMAT", "json");
    let result = cli.run(&["version", "--format=text"]);
    result.assert_success();

    assert!(
        serde_json::from_str::<serde_json::Value>(result.stdout.trim()).is_err(),
        "--format=text should override KOBOSWITCH_FORMAT=json"
    );
}

#[test]
fn config_env_changes_account_table() {
    init_test_logging();
    let device = DeviceFixture::new();
    let config = device.root().join("koboswitch.toml");
    std::fs::write(&config, "user_table = \"content\"\n").unwrap();
    let (mount, _) = device.args();

    // The account table is left alone; the configured one is wiped.
    CliRunner::new()
        .with_env("KOBOSWITCH_CONFIG", &config.display().to_string())
        .run(&["truncate", &mount, "--yes"])
        .assert_success()
        .assert_stdout_contains("'content'");
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
}

#[test]
fn missing_config_file_is_reported() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, _) = device.args();

    CliRunner::new()
        .with_env("KOBOSWITCH_CONFIG", "/nonexistent/koboswitch.toml")
        .run(&["truncate", &mount, "--yes"])
        .assert_exit_code(1)
        .assert_stderr_contains("Configuration file not found");
}
