//! Registration and restart behavior

use crate::prelude::*;

#[test]
fn register_then_list_users() {
    let ledger = Ledger::new();

    ledger
        .run(&["register", "10", "ana", "Ana Maria"])
        .success()
        .stdout(predicate::str::contains("Registered ana"));

    ledger
        .run(&["users"])
        .success()
        .stdout(predicate::str::contains("ana (10)"));
}

#[test]
fn duplicate_name_is_rejected_case_insensitively() {
    let ledger = Ledger::new();

    ledger.run(&["register", "10", "Ana"]).success();
    ledger
        .run(&["register", "20", "ana"])
        .success()
        .stdout(predicate::str::contains("already taken"));
}

#[test]
fn invalid_name_is_reported() {
    let ledger = Ledger::new();

    ledger
        .run(&["register", "10", "a;b"])
        .success()
        .stdout(predicate::str::contains("Invalid name"));
}

#[test]
fn state_persists_across_invocations() {
    let ledger = Ledger::new();

    ledger.run(&["register", "10", "ana"]).success();
    ledger.run(&["assign", "ana", "1-3"]).success();
    ledger.run(&["sell", "10", "2"]).success();

    ledger
        .run(&["available", "ana"])
        .success()
        .stdout(predicate::str::contains("1, 3"));
}

#[test]
fn journaled_sale_from_a_crashed_run_is_recovered() {
    let ledger = Ledger::new();

    // Establish the store files
    ledger.run(&["register", "20", "luis"]).success();

    // A sale line whose snapshot flush never happened
    std::fs::write(
        ledger.path().join("sales.log"),
        "sale;20;luis;42;2026-08-06T12:00:00\n",
    )
    .unwrap();

    ledger
        .run(&["sold", "20"])
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn unusable_data_dir_fails_with_nonzero_exit() {
    let ledger = Ledger::new();
    // A file where the data directory should be
    let blocked = ledger.path().join("blocked");
    std::fs::write(&blocked, "x").unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("rifa").unwrap();
    cmd.arg("--data-dir")
        .arg(&blocked)
        .args(["users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening store"));
}

#[test]
fn unknown_buyer_fails_with_nonzero_exit() {
    let ledger = Ledger::new();

    ledger
        .run(&["sell", "99", "1"])
        .failure()
        .stderr(predicate::str::contains("not registered"));
}
