//! Assignment and selling flows

use crate::prelude::*;

fn with_two_users() -> Ledger {
    let ledger = Ledger::new();
    ledger.run(&["register", "10", "ana"]).success();
    ledger.run(&["register", "20", "luis"]).success();
    ledger
}

#[test]
fn assign_conflict_names_the_current_owner() {
    let ledger = with_two_users();

    ledger
        .run(&["assign", "ana", "7"])
        .success()
        .stdout(predicate::str::contains("7: assigned"));
    ledger
        .run(&["assign", "luis", "7"])
        .success()
        .stdout(predicate::str::contains("7: assigned to ana"));
}

#[test]
fn sell_accepts_ranges_and_reports_per_ticket() {
    let ledger = with_two_users();

    ledger.run(&["assign", "ana", "1-3"]).success();
    ledger.run(&["sell", "10", "1", "3"]).success();

    ledger
        .run(&["sell", "10", "1-3"])
        .success()
        .stdout(
            predicate::str::contains("1: already sold")
                .and(predicate::str::contains("2: sold"))
                .and(predicate::str::contains("3: already sold")),
        );
}

#[test]
fn selling_outside_the_lot_is_rejected() {
    let ledger = with_two_users();

    ledger.run(&["assign", "ana", "7"]).success();

    ledger
        .run(&["sell", "10", "8"])
        .success()
        .stdout(predicate::str::contains("8: outside your lot"));
    ledger
        .run(&["sell", "20", "7"])
        .success()
        .stdout(predicate::str::contains("7: assigned to ana"));
    // A buyer with no lot may take unassigned tickets
    ledger
        .run(&["sell", "20", "8"])
        .success()
        .stdout(predicate::str::contains("8: sold"));
}

#[test]
fn return_frees_the_ticket_for_resale() {
    let ledger = with_two_users();

    ledger.run(&["sell", "10", "42"]).success();
    ledger
        .run(&["return", "10", "42"])
        .success()
        .stdout(predicate::str::contains("42: returned"));
    ledger
        .run(&["sell", "10", "42"])
        .success()
        .stdout(predicate::str::contains("42: sold"));
}

#[test]
fn json_output_is_machine_readable() {
    let ledger = with_two_users();

    let value = ledger.run_json(&["sell", "10", "5"]);
    assert_eq!(value[0]["ticket"], 5);
    assert_eq!(value[0]["result"], "sold");

    let value = ledger.run_json(&["sell", "20", "5"]);
    assert_eq!(value[0]["result"], "already_sold");

    let value = ledger.run_json(&["summary"]);
    assert_eq!(value["total"], 1);
    assert_eq!(value["by_seller"]["ana"], 1);
}

#[test]
fn garbage_ticket_arguments_fail() {
    let ledger = with_two_users();

    ledger
        .run(&["sell", "10", "abc"])
        .failure()
        .stderr(predicate::str::contains("no valid ticket numbers"));
}
