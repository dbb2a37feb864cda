// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation of journals against snapshots
//!
//! A crash between journal-append and snapshot-flush leaves the journal
//! ahead of the snapshot. This pass runs once, before the store accepts
//! any request: it loads the snapshots, replays both journals applying
//! only entries not yet reflected, and rewrites any snapshot the replay
//! changed so the gap is closed before normal operation resumes.
//!
//! Replay is idempotent. Sale events union by `(buyer_id, buyer_name,
//! ticket)`; return events remove the matching sale (a no-op when absent)
//! and insert the return row only when that event still had something to
//! recover. Malformed lines are skipped and counted, never fatal.

use crate::config::DataLayout;
use crate::journal::{EventKind, Journal, JournalError};
use crate::snapshot::{read_records, SnapshotError, SnapshotWriter};
use crate::table::{Table, TableKind, Tables};
use rifa_core::{canonical, Assignment, Record, Return, Sale, Ticket, User};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that abort reconciliation (real I/O failures only)
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// What one reconciliation pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sale events inserted because the snapshot missed them
    pub recovered_sales: u64,
    /// Return events that still had an effect to apply
    pub applied_returns: u64,
    /// Sale rows removed by replayed returns
    pub removed_sales: u64,
    /// Events that matched nothing and were dropped with a warning
    pub anomalies: u64,
    /// Malformed journal lines skipped
    pub skipped_journal_lines: u64,
    /// Malformed or duplicate snapshot rows skipped
    pub skipped_snapshot_rows: u64,
}

impl ReconcileReport {
    pub fn clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Rebuild consistent tables from the persisted state.
///
/// Runs once per startup; rewrites any snapshot the replay changed before
/// returning, so the caller starts from a closed journal-vs-snapshot gap.
pub fn reconcile(
    layout: &DataLayout,
    writer: &SnapshotWriter,
) -> Result<(Tables, ReconcileReport), ReconcileError> {
    let mut report = ReconcileReport::default();

    let (user_rows, skipped) = read_records::<User>(&layout.snapshot(User::TABLE))?;
    report.skipped_snapshot_rows += skipped;
    let users = Table::from_rows(user_rows);

    let (assignment_rows, skipped) =
        read_records::<Assignment>(&layout.snapshot(Assignment::TABLE))?;
    report.skipped_snapshot_rows += skipped;
    let assignments = load_assignments(assignment_rows, &mut report);

    let (sale_rows, skipped) = read_records::<Sale>(&layout.snapshot(Sale::TABLE))?;
    report.skipped_snapshot_rows += skipped;
    let sales = Table::from_rows(sale_rows);

    let (return_rows, skipped) = read_records::<Return>(&layout.snapshot(Return::TABLE))?;
    report.skipped_snapshot_rows += skipped;
    let returns = Table::from_rows(return_rows);

    let sales_changed = replay_sales(layout, &sales, &mut report)?;
    let (sales_changed_by_returns, returns_changed) =
        replay_returns(layout, &sales, &returns, &mut report)?;

    let tables = Tables {
        users,
        assignments,
        sales,
        returns,
    };

    if sales_changed || sales_changed_by_returns {
        tables.write_snapshot(TableKind::Sales, writer, layout)?;
    }
    if returns_changed {
        tables.write_snapshot(TableKind::Returns, writer, layout)?;
    }

    if !report.clean() {
        tracing::info!(
            recovered_sales = report.recovered_sales,
            applied_returns = report.applied_returns,
            removed_sales = report.removed_sales,
            anomalies = report.anomalies,
            skipped_journal_lines = report.skipped_journal_lines,
            skipped_snapshot_rows = report.skipped_snapshot_rows,
            "reconciled persisted state"
        );
    }

    Ok((tables, report))
}

/// One owner per ticket: the first snapshot row wins, duplicates are
/// dropped and counted.
fn load_assignments(rows: Vec<Assignment>, report: &mut ReconcileReport) -> Table<Assignment> {
    let table: Table<Assignment> = Table::new();
    {
        let mut guard = table.lock();
        for row in rows {
            if let Some(existing) = guard.get(&row.ticket) {
                report.skipped_snapshot_rows += 1;
                tracing::warn!(
                    ticket = %row.ticket,
                    kept = %existing.owner,
                    dropped = %row.owner,
                    "dropping duplicate assignment row"
                );
                continue;
            }
            guard.insert(row.key(), row);
        }
    }
    table
}

fn replay_sales(
    layout: &DataLayout,
    sales: &Table<Sale>,
    report: &mut ReconcileReport,
) -> Result<bool, ReconcileError> {
    let (events, skipped) = Journal::read_events(&layout.journal(EventKind::Sale))?;
    report.skipped_journal_lines += skipped;

    let mut changed = false;
    let mut guard = sales.lock();
    for event in events {
        if event.kind != EventKind::Sale {
            report.skipped_journal_lines += 1;
            continue;
        }
        match guard.get(&event.ticket) {
            Some(sale) if same_buyer(sale, event.user_id, &event.user_name) => {}
            Some(sale) => {
                // The snapshot says this ticket belongs to someone else;
                // inserting the event would double-sell it.
                report.anomalies += 1;
                tracing::warn!(
                    ticket = %event.ticket,
                    snapshot_buyer = %sale.buyer_name,
                    journal_buyer = %event.user_name,
                    "sale event conflicts with snapshot; dropping"
                );
            }
            None => {
                guard.insert(
                    event.ticket,
                    Sale {
                        ticket: event.ticket,
                        buyer_id: event.user_id,
                        buyer_name: event.user_name.clone(),
                        timestamp: event.timestamp,
                        returned_by: None,
                    },
                );
                report.recovered_sales += 1;
                changed = true;
            }
        }
    }
    Ok(changed)
}

fn replay_returns(
    layout: &DataLayout,
    sales: &Table<Sale>,
    returns: &Table<Return>,
    report: &mut ReconcileReport,
) -> Result<(bool, bool), ReconcileError> {
    let (events, skipped) = Journal::read_events(&layout.journal(EventKind::Return))?;
    report.skipped_journal_lines += skipped;

    let mut sales_changed = false;
    let mut returns_changed = false;

    let mut sales_guard = sales.lock();
    let mut returns_guard = returns.lock();

    // Dedup key over the returns already in the snapshot
    let mut seen: BTreeSet<(Ticket, i64, String)> = returns_guard
        .values()
        .map(|r| (r.ticket, r.buyer_id, canonical(&r.buyer_name)))
        .collect();

    for event in events {
        if event.kind != EventKind::Return {
            report.skipped_journal_lines += 1;
            continue;
        }

        // A sale stamped after the return is a re-sell, not the sale this
        // return undid; only an older matching sale is removed.
        let matches = sales_guard.get(&event.ticket).is_some_and(|sale| {
            same_buyer(sale, event.user_id, &event.user_name)
                && sale.timestamp <= event.timestamp
        });
        let removed = if matches {
            sales_guard.remove(&event.ticket);
            report.removed_sales += 1;
            sales_changed = true;
            true
        } else {
            false
        };

        let key = (event.ticket, event.user_id, canonical(&event.user_name));
        let already_recorded = seen.contains(&key);

        if removed && !already_recorded {
            let row = Return {
                ticket: event.ticket,
                buyer_id: event.user_id,
                buyer_name: event.user_name.clone(),
                returned_by: event.returned_by().to_string(),
                timestamp: event.timestamp,
            };
            returns_guard.insert(row.key(), row);
            seen.insert(key);
            returns_changed = true;
            report.applied_returns += 1;
        } else if removed {
            // The return row reached its snapshot but the sale removal did
            // not; the removal above is the whole recovery.
            report.applied_returns += 1;
        } else if !already_recorded {
            // A return for a ticket never sold: irreconcilable, so the
            // event is a logged no-op rather than a fabricated audit row.
            report.anomalies += 1;
            tracing::warn!(
                ticket = %event.ticket,
                buyer = %event.user_name,
                "return event matches no sale and no recorded return; dropping"
            );
        }
    }

    Ok((sales_changed, returns_changed))
}

fn same_buyer(sale: &Sale, user_id: i64, user_name: &str) -> bool {
    sale.buyer_id == user_id && canonical(&sale.buyer_name) == canonical(user_name)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
