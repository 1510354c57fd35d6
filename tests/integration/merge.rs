//! Integration tests for carrying account rows between databases.

use rusqlite::Connection;
use tempfile::TempDir;

use koboswitch::database::{KoboDatabase, create_merged_copy};
use koboswitch::error::SwitchError;
use koboswitch::replicate::NativeCopier;
use koboswitch::replicate::mock::RecordingCopier;

use crate::common::fixtures::{create_user_db, user_ids};
use crate::common::init_test_logging;

#[test]
fn merged_copy_has_new_schema_and_old_rows() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.sqlite");
    let new = dir.path().join("new.sqlite");
    let out = dir.path().join("out.sqlite");
    create_user_db(&old, &[("a", "ka", "a@example.com"), ("b", "kb", "b@example.com")]);
    create_user_db(&new, &[("n", "kn", "n@example.com")]);

    let report = create_merged_copy(&NativeCopier, &old, &new, &out, "user").unwrap();

    assert_eq!(user_ids(&out), vec!["a", "b"]);
    assert_eq!(user_ids(&old), vec!["a", "b"]);
    assert_eq!(user_ids(&new), vec!["n"]);
    assert_eq!(report.rows_removed, 1);
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.columns.len(), 7);
}

#[test]
fn merge_copies_through_the_given_copier() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.sqlite");
    let new = dir.path().join("new.sqlite");
    let out = dir.path().join("out.sqlite");
    create_user_db(&old, &[]);
    create_user_db(&new, &[]);
    let copier = RecordingCopier::new();

    create_merged_copy(&copier, &old, &new, &out, "user").unwrap();

    assert_eq!(copier.copied_files(), vec![out]);
}

#[test]
fn reordered_columns_are_rejected() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.sqlite");
    let new = dir.path().join("new.sqlite");
    let out = dir.path().join("out.sqlite");
    create_user_db(&old, &[("a", "ka", "a@example.com")]);
    Connection::open(&new)
        .unwrap()
        .execute_batch(
            "CREATE TABLE user (
                UserKey TEXT NOT NULL, UserID TEXT NOT NULL PRIMARY KEY,
                UserDisplayName TEXT, UserEmail TEXT, ___DeviceID TEXT,
                FacebookAuthToken TEXT, HasMadePurchase BOOL DEFAULT FALSE
            );
            INSERT INTO user (UserKey, UserID) VALUES ('kn', 'n');",
        )
        .unwrap();

    let err = create_merged_copy(&NativeCopier, &old, &new, &out, "user").unwrap_err();

    assert!(matches!(err, SwitchError::ColumnOrderMismatch { .. }), "{err}");
    assert_eq!(user_ids(&out), vec!["n"]);
}

#[test]
fn missing_table_is_reported() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.sqlite");
    let new = dir.path().join("new.sqlite");
    create_user_db(&old, &[]);
    Connection::open(&new)
        .unwrap()
        .execute_batch("CREATE TABLE content (ContentID TEXT)")
        .unwrap();

    let err = create_merged_copy(&NativeCopier, &old, &new, &dir.path().join("out"), "user")
        .unwrap_err();
    assert!(matches!(err, SwitchError::TableNotFound { .. }), "{err}");
}

#[test]
fn missing_input_creates_no_output() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let new = dir.path().join("new.sqlite");
    let out = dir.path().join("out.sqlite");
    create_user_db(&new, &[]);

    let err = create_merged_copy(&NativeCopier, &dir.path().join("absent"), &new, &out, "user")
        .unwrap_err();

    assert!(matches!(err, SwitchError::DatabaseNotFound { .. }));
    assert!(!out.exists());
}

#[test]
fn inspect_summary_matches_table() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("db.sqlite");
    create_user_db(&db, &[("a", "ka", "a@example.com")]);

    let summary = KoboDatabase::open_read_only(&db).unwrap().summary("user").unwrap();

    assert_eq!(summary.rows, 1);
    assert_eq!(summary.columns.first().map(String::as_str), Some("UserID"));
    assert_eq!(summary.columns.last().map(String::as_str), Some("HasMadePurchase"));
}
