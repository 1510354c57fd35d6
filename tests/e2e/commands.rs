//! Command end-to-end tests in human mode, answering prompts on stdin.

use crate::common::cli::CliRunner;
use crate::common::fixtures::{DeviceFixture, create_user_db, user_ids};
use crate::common::{init_test_logging, tree_contents};

#[test]
fn shorthand_run_with_all_yes() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    // Backup, truncate, disconnect, reconnect, merge, install.
    let result = CliRunner::new()
        .with_stdin("y\ny\ny\ny\ny\ny\n")
        .run(&[&mount, &backup]);

    result
        .assert_success()
        .assert_stdout_contains("Account switch")
        .assert_stderr_contains("Back up");
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
    assert_eq!(device.read("Books/Emma.epub"), "emma");
}

#[test]
fn run_with_yes_still_waits_for_reconnect() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    // Only the reconnect prompt reads stdin.
    let result = CliRunner::new()
        .with_stdin("y\n")
        .run(&["run", &mount, &backup, "--yes"]);

    result.assert_success().assert_stderr_contains("reconnect");
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
}

#[test]
fn declined_truncate_exits_2_and_keeps_backup() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    let result = CliRunner::new()
        .with_stdin("y\nn\n")
        .run(&["run", &mount, &backup]);

    result.assert_exit_code(2).assert_stderr_contains("truncate");
    assert!(device.backup_database().is_file());
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
}

#[test]
fn closed_stdin_declines_first_prompt() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    CliRunner::new()
        .run(&["run", &mount, &backup])
        .assert_exit_code(2);
    assert!(!device.backup().exists());
}

#[test]
fn missing_mount_point_fails() {
    init_test_logging();
    let device = DeviceFixture::new();
    let missing = device.root().join("not-mounted").display().to_string();
    let backup = device.backup().display().to_string();

    CliRunner::new()
        .with_stdin("y\n")
        .run(&[&missing, &backup])
        .assert_exit_code(1)
        .assert_stderr_contains("does not exist");
    assert!(!device.backup().exists());
}

#[test]
fn existing_backup_fails_without_copying() {
    init_test_logging();
    let device = DeviceFixture::new();
    std::fs::create_dir_all(device.backup()).unwrap();
    let (mount, backup) = device.args();

    CliRunner::new()
        .with_stdin("y\n")
        .run(&["backup", &mount, &backup])
        .assert_exit_code(1)
        .assert_stderr_contains("already exists");
    assert!(tree_contents(&device.backup()).is_empty());
}

#[test]
fn single_steps_compose() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, backup) = device.args();

    CliRunner::new()
        .run(&["backup", &mount, &backup])
        .assert_success()
        .assert_stdout_contains("Backup complete");
    assert_eq!(tree_contents(&device.backup()), tree_contents(&device.mount()));

    CliRunner::new()
        .run(&["truncate", &mount, "--yes"])
        .assert_success()
        .assert_stdout_contains("Deleted 1 row(s)");
    assert!(user_ids(&device.database()).is_empty());

    std::fs::remove_file(device.mount().join("notes.txt")).unwrap();
    CliRunner::new()
        .run(&["restore", &backup, &mount])
        .assert_success()
        .assert_stdout_contains("Restore complete");
    assert_eq!(device.read("notes.txt"), "remember the milk");
    // Restore never touches the device database.
    assert!(user_ids(&device.database()).is_empty());
}

#[test]
fn truncate_prompt_defaults_to_no() {
    init_test_logging();
    let device = DeviceFixture::new();
    let (mount, _) = device.args();

    CliRunner::new()
        .with_stdin("\n")
        .run(&["truncate", &mount])
        .assert_exit_code(2);
    assert_eq!(user_ids(&device.database()), vec!["old-user"]);
}

#[test]
fn merge_refuses_existing_output() {
    init_test_logging();
    let device = DeviceFixture::new();
    let other = device.root().join("other.sqlite");
    create_user_db(&other, &[]);
    let db = device.database().display().to_string();
    let other = other.display().to_string();

    CliRunner::new()
        .run(&["merge", "--old", &db, "--new", &other, "--output", &db])
        .assert_exit_code(1)
        .assert_stderr_contains("already exists");
}
