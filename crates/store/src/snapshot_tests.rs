// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rifa_core::{RetryPolicy, Sale, User};
use std::time::Duration;
use tempfile::TempDir;

fn writer() -> SnapshotWriter {
    SnapshotWriter::new(RetryPolicy::new(2, Duration::from_millis(1)))
}

fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn write_produces_header_and_rows_with_trailing_newline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer()
        .write(
            &path,
            User::HEADERS,
            &rows(&[&["1", "ana", "Ana Maria"], &["2", "luis", ""]]),
        )
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "user_id,user_name,full_name\n1,ana,Ana Maria\n2,luis,\n"
    );
}

#[test]
fn write_replaces_previous_content_atomically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer()
        .write(&path, User::HEADERS, &rows(&[&["1", "ana", ""]]))
        .unwrap();
    writer()
        .write(&path, User::HEADERS, &rows(&[&["2", "luis", ""]]))
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(!content.contains("ana"));
    assert!(content.contains("luis"));
}

#[test]
fn write_leaves_no_temp_files_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer()
        .write(&path, User::HEADERS, &rows(&[&["1", "ana", ""]]))
        .unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["users.csv"]);
}

#[test]
fn failed_rename_preserves_previous_snapshot_and_cleans_temp() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer()
        .write(&path, User::HEADERS, &rows(&[&["1", "ana", ""]]))
        .unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    // Replace the target with a non-empty directory: rename over it fails
    // on every platform, simulating an exclusively locked snapshot.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("keep"), "x").unwrap();

    let result = writer().write(&path, User::HEADERS, &rows(&[&["2", "luis", ""]]));
    assert!(result.is_err());

    // Prior state intact, temp cleaned up
    assert!(path.join("keep").exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");

    // And once the obstruction is gone the same write succeeds
    std::fs::remove_dir_all(&path).unwrap();
    writer()
        .write(&path, User::HEADERS, &rows(&[&["2", "luis", ""]]))
        .unwrap();
    let after = std::fs::read_to_string(&path).unwrap();
    assert_ne!(before, after);
}

#[test]
fn fields_with_commas_and_quotes_are_quoted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer()
        .write(
            &path,
            User::HEADERS,
            &rows(&[&["1", "ana", "Pérez, Ana \"La Jefa\""]]),
        )
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"Pérez, Ana \"\"La Jefa\"\"\""));

    let (users, skipped) = read_records::<User>(&path).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(users[0].full_name, "Pérez, Ana \"La Jefa\"");
}

#[test]
fn read_records_of_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let (users, skipped) = read_records::<User>(&dir.path().join("users.csv")).unwrap();
    assert!(users.is_empty());
    assert_eq!(skipped, 0);
}

#[test]
fn read_records_skips_malformed_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.csv");
    std::fs::write(
        &path,
        "ticket,buyer_id,buyer_name,timestamp,returned_by\n\
         42,1,ana,2026-08-06T12:00:00,\n\
         not-a-ticket,1,ana,2026-08-06T12:00:00,\n\
         43,2,luis\n\
         \"unterminated,2,luis,2026-08-06T12:00:00,\n",
    )
    .unwrap();

    let (sales, skipped) = read_records::<Sale>(&path).unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].ticket, rifa_core::Ticket(42));
    assert_eq!(skipped, 3);
}

#[test]
fn empty_snapshot_has_only_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");

    writer().write(&path, User::HEADERS, &[]).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "user_id,user_name,full_name\n");
    let (users, skipped) = read_records::<User>(&path).unwrap();
    assert!(users.is_empty());
    assert_eq!(skipped, 0);
}
