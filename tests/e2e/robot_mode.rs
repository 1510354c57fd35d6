//! Robot-mode end-to-end tests.

use serde_json::{Value, json};

use crate::common::cli::CliRunner;
use crate::common::fixtures::{DeviceFixture, create_user_db, user_ids};
use crate::common::init_test_logging;

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let result = CliRunner::new().run(&["--robot"]);
    result.assert_success();

    let json = result.json();
    assert_eq!(json.get("tool").and_then(Value::as_str), Some("koboswitch"));
    assert!(json["commands"].as_array().is_some_and(|c| c.len() >= 6));
}

#[test]
fn robot_run_reports_every_stage() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    let result = CliRunner::new()
        .with_stdin("y\ny\ny\ny\ny\ny\n")
        .run_robot(&["run", &mount, &backup]);

    result
        .assert_success()
        .assert_json_field("/command", &json!("run"))
        .assert_json_field("/report/stage", &json!("installed"))
        .assert_json_field("/report/truncated_rows", &json!(1))
        .assert_json_field("/report/restore/ignored", &json!(1))
        .assert_json_field("/report/merge/rows_inserted", &json!(1))
        .assert_json_field_exists("/report/merge_files/device_copy");
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
}

#[test]
fn robot_merge_and_inspect() {
    init_test_logging();
    let device = DeviceFixture::new();
    let new_db = device.root().join("new.sqlite");
    let out = device.root().join("merged.sqlite");
    create_user_db(&new_db, &[("n1", "k1", "n1@example.com"), ("n2", "k2", "n2@example.com")]);
    let old = device.database().display().to_string();
    let new = new_db.display().to_string();
    let out_arg = out.display().to_string();

    CliRunner::new()
        .run_robot(&["merge", "--old", &old, "--new", &new, "--output", &out_arg])
        .assert_success()
        .assert_json_field("/report/rows_removed", &json!(2))
        .assert_json_field("/report/rows_inserted", &json!(1))
        .assert_json_array_len("/report/columns", 7);

    CliRunner::new()
        .run_robot(&["inspect", &out_arg])
        .assert_success()
        .assert_json_field("/table", &json!("user"))
        .assert_json_field("/rows", &json!(1))
        .assert_json_field("/columns/0", &json!("UserID"));
}

#[test]
fn robot_error_has_code_and_suggestion() {
    init_test_logging();
    let device = DeviceFixture::new();
    std::fs::create_dir_all(device.backup()).unwrap();
    let (mount, backup) = device.args();

    let result = CliRunner::new().run_robot(&["backup", &mount, &backup]);
    result.assert_exit_code(1).assert_stdout_is_empty();

    let err = result.stderr_json();
    assert_eq!(err["error"], true);
    assert_eq!(err["code"], "backup_exists");
    assert_eq!(err["recoverable"], true);
    assert!(err["suggestion"].is_string());
    assert!(err["message"].as_str().unwrap().contains("already exists"));
}

#[test]
fn robot_backup_inside_mount_is_refused() {
    init_test_logging();
    let device = DeviceFixture::new();
    let mount = device.mount().display().to_string();
    let nested = device.mount().join("kobo-backup");
    let backup = nested.display().to_string();

    let result = CliRunner::new().run_robot(&["backup", &mount, &backup]);
    result.assert_exit_code(1).assert_stdout_is_empty();
    assert_eq!(result.stderr_json()["code"], "nested_roots");
    assert!(!nested.exists());
}

#[test]
fn robot_declined_prompt_reports_aborted() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, _) = device.args();

    let result = CliRunner::new()
        .with_stdin("n\n")
        .run_robot(&["truncate", &mount]);
    result.assert_exit_code(2);
    assert_eq!(result.stderr_json()["code"], "aborted");
}

#[test]
fn robot_format_flag_outputs_json() {
    init_test_logging();
    let result = CliRunner::new().run(&["version", "--format=json"]);
    result.assert_success();
    assert!(result.json().get("version").is_some());
}
