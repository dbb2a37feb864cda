//! Range marker and administrative reset

use crate::prelude::*;

#[test]
fn range_is_unset_until_defined() {
    let ledger = Ledger::new();

    ledger
        .run(&["range"])
        .success()
        .stdout(predicate::str::contains("No range defined"));

    ledger
        .run(&["range", "1-1000"])
        .success()
        .stdout(predicate::str::contains("Range updated to 1-1000"));

    ledger
        .run(&["range"])
        .success()
        .stdout(predicate::str::contains("Current range: 1-1000"));

    let marker = std::fs::read_to_string(ledger.path().join("range.txt")).unwrap();
    assert_eq!(marker, "1-1000\n");
}

#[test]
fn reversed_range_normalizes() {
    let ledger = Ledger::new();

    ledger
        .run(&["range", "1000-1"])
        .success()
        .stdout(predicate::str::contains("1-1000"));
}

#[test]
fn reset_requires_confirmation() {
    let ledger = Ledger::new();
    ledger.run(&["register", "10", "ana"]).success();

    ledger
        .run(&["reset"])
        .failure()
        .stderr(predicate::str::contains("--yes"));

    ledger
        .run(&["reset", "--yes"])
        .success()
        .stdout(predicate::str::contains("archived journals"));

    ledger
        .run(&["users"])
        .success()
        .stdout(predicate::str::contains("No users registered"));
}

#[test]
fn reset_archives_the_journals() {
    let ledger = Ledger::new();
    ledger.run(&["register", "10", "ana"]).success();
    ledger.run(&["sell", "10", "1"]).success();

    ledger.run(&["reset", "--yes"]).success();

    let archives: Vec<_> = std::fs::read_dir(ledger.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("sales-") && name.ends_with(".log"))
        .collect();
    assert_eq!(archives.len(), 1);

    // The live journal is fresh
    let journal = std::fs::read_to_string(ledger.path().join("sales.log")).unwrap();
    assert!(journal.is_empty());
}
