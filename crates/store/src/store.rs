// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store coordinator
//!
//! The only mutating entry points collaborators may call. Every write
//! follows the same discipline: validate against the in-memory tables
//! under their locks, append the durable journal line, apply the mutation,
//! then request an asynchronous snapshot flush. A journal failure aborts
//! the operation with nothing mutated, surfaced as
//! [`StoreError::Unavailable`] so callers can distinguish "retry me" from
//! a business rejection.

use crate::config::{DataLayout, StoreConfig};
use crate::flush::Flusher;
use crate::journal::{EventKind, Journal, JournalError, JournalEvent};
use crate::reconcile::{reconcile, ReconcileError, ReconcileReport};
use crate::snapshot::{SnapshotError, SnapshotWriter};
use crate::table::{TableKind, Tables};
use chrono::Timelike;
use fs2::FileExt;
use rifa_core::{
    canonical, validate_display_name, AssignOutcome, Assignment, Clock, Record, RegisterOutcome,
    Return, ReturnOutcome, Sale, SellOutcome, SystemClock, Ticket, TicketRange, UnassignOutcome,
    User,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Journal write failed after bounded retries; the operation was
    /// rejected with nothing mutated and may be retried transparently.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] JournalError),
    #[error("another process holds the store lock at {path}")]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl From<ReconcileError> for StoreError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Journal(e) => Self::Journal(e),
            ReconcileError::Snapshot(e) => Self::Snapshot(e),
        }
    }
}

/// Sales totals for the summary query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub total: usize,
    pub by_seller: BTreeMap<String, usize>,
}

/// What an administrative reset archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub archived_journals: Vec<PathBuf>,
}

/// The durable tabular store: four tables, two journals, one flusher
pub struct Store<C: Clock = SystemClock> {
    layout: DataLayout,
    tables: Arc<Tables>,
    sales_journal: Mutex<Journal>,
    returns_journal: Mutex<Journal>,
    snapshots: SnapshotWriter,
    flusher: Flusher,
    reconcile_report: ReconcileReport,
    clock: C,
    // NOTE(lifetime): Held to maintain the exclusive single-writer file
    // lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl Store<SystemClock> {
    /// Open a store at the given data directory.
    ///
    /// Acquires the exclusive writer lock, reconciles journals against
    /// snapshots, and only then starts accepting operations.
    pub fn open(data_dir: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_clock(data_dir, config, SystemClock)
    }

    /// Open a store in a fresh temporary directory (for testing)
    pub fn open_temp() -> Result<Self, StoreError> {
        let dir = std::env::temp_dir().join(format!("rifa-store-test-{}", uuid::Uuid::new_v4()));
        Self::open(&dir, StoreConfig::default())
    }
}

impl<C: Clock> Store<C> {
    pub fn open_with_clock(
        data_dir: &Path,
        config: StoreConfig,
        clock: C,
    ) -> Result<Self, StoreError> {
        let layout = DataLayout::new(data_dir);
        std::fs::create_dir_all(layout.root())?;

        // Lock first: prevents a second writer from racing the recovery
        let lock_path = layout.lock_file();
        let mut lock_file = File::create(&lock_path)?;
        lock_file
            .try_lock_exclusive()
            .map_err(|source| StoreError::Locked {
                path: lock_path,
                source,
            })?;
        let _ = writeln!(lock_file, "{}", std::process::id());

        let snapshots = SnapshotWriter::new(config.snapshot_retry);
        let (tables, reconcile_report) = reconcile(&layout, &snapshots)?;
        let tables = Arc::new(tables);

        let sales_journal = Journal::open(&layout.journal(EventKind::Sale), config.journal_retry)?;
        let returns_journal =
            Journal::open(&layout.journal(EventKind::Return), config.journal_retry)?;

        let flusher = Flusher::spawn(tables.clone(), snapshots.clone(), layout.clone());

        Ok(Self {
            layout,
            tables,
            sales_journal: Mutex::new(sales_journal),
            returns_journal: Mutex::new(returns_journal),
            snapshots,
            flusher,
            reconcile_report,
            clock,
            lock_file,
        })
    }

    /// What startup reconciliation recovered
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.reconcile_report
    }

    pub fn data_dir(&self) -> &Path {
        self.layout.root()
    }

    // === Mutating operations ===

    /// Register a user on first contact.
    pub fn register_user(
        &self,
        id: i64,
        name: &str,
        full_name: &str,
    ) -> Result<RegisterOutcome, StoreError> {
        if let Err(e) = validate_display_name(name) {
            return Ok(RegisterOutcome::InvalidName {
                reason: e.to_string(),
            });
        }

        {
            let mut users = self.tables.users.lock();
            if users.contains_key(&id) {
                return Ok(RegisterOutcome::AlreadyRegistered);
            }
            let canon = canonical(name);
            if users.values().any(|u| canonical(&u.name) == canon) {
                return Ok(RegisterOutcome::NameTaken);
            }
            users.insert(
                id,
                User {
                    id,
                    name: name.trim().to_string(),
                    full_name: full_name.trim().to_string(),
                },
            );
        }

        self.flush(TableKind::Users);
        Ok(RegisterOutcome::Registered)
    }

    /// Reserve a ticket for an owner. Assignments are a current-state
    /// projection, not safety-critical history, so they skip the journal:
    /// losing one to a crash only requires an operator retry.
    pub fn assign(&self, owner: &str, ticket: Ticket) -> Result<AssignOutcome, StoreError> {
        let outcome = {
            let mut assignments = self.tables.assignments.lock();
            match assignments.get(&ticket) {
                Some(a) if canonical(&a.owner) == canonical(owner) => {
                    return Ok(AssignOutcome::AlreadyAssignedToSelf)
                }
                Some(a) => {
                    return Ok(AssignOutcome::Conflict {
                        owner: a.owner.clone(),
                    })
                }
                None => {
                    assignments.insert(
                        ticket,
                        Assignment {
                            owner: owner.trim().to_string(),
                            ticket,
                        },
                    );
                    AssignOutcome::Assigned
                }
            }
        };

        self.flush(TableKind::Assignments);
        Ok(outcome)
    }

    /// Remove a reservation.
    pub fn unassign(&self, owner: &str, ticket: Ticket) -> Result<UnassignOutcome, StoreError> {
        let removed = {
            let mut assignments = self.tables.assignments.lock();
            let owned = assignments
                .get(&ticket)
                .is_some_and(|a| canonical(&a.owner) == canonical(owner));
            if owned {
                assignments.remove(&ticket);
            }
            owned
        };

        if removed {
            self.flush(TableKind::Assignments);
            Ok(UnassignOutcome::Removed)
        } else {
            Ok(UnassignOutcome::NotAssigned)
        }
    }

    /// Sell a ticket to a buyer.
    ///
    /// At most one active sale per ticket, enforced under the sales lock;
    /// the journal line is durable before the table changes.
    pub fn sell(
        &self,
        buyer_id: i64,
        buyer_name: &str,
        ticket: Ticket,
    ) -> Result<SellOutcome, StoreError> {
        // Lock order: assignments → sales
        let assignments = self.tables.assignments.lock();
        let mut sales = self.tables.sales.lock();

        if sales.contains_key(&ticket) {
            return Ok(SellOutcome::AlreadySold);
        }

        let me = canonical(buyer_name);
        match assignments.get(&ticket) {
            Some(a) if canonical(&a.owner) != me => {
                return Ok(SellOutcome::AssignedToOther {
                    owner: a.owner.clone(),
                });
            }
            Some(_) => {}
            None => {
                // A buyer who holds a lot may only sell from it; a buyer
                // with no lot at all may sell any unassigned ticket.
                let has_lot = assignments.values().any(|a| canonical(&a.owner) == me);
                if has_lot {
                    return Ok(SellOutcome::NotInLot);
                }
            }
        }

        let timestamp = self.now();
        let event = JournalEvent::sale(buyer_id, buyer_name, ticket, timestamp);
        if let Err(e) = self.journal(EventKind::Sale).append(&event) {
            return Err(StoreError::Unavailable(e));
        }

        sales.insert(
            ticket,
            Sale {
                ticket,
                buyer_id,
                buyer_name: buyer_name.to_string(),
                timestamp,
                returned_by: None,
            },
        );

        drop(sales);
        drop(assignments);
        self.flush(TableKind::Sales);
        Ok(SellOutcome::Sold)
    }

    /// Return a previously sold ticket.
    ///
    /// Symmetric discipline: journal first, then move the row from the
    /// sales table into the immutable returns history.
    pub fn return_ticket(
        &self,
        buyer_id: i64,
        ticket: Ticket,
        returned_by: &str,
    ) -> Result<ReturnOutcome, StoreError> {
        // Lock order: sales → returns
        let mut sales = self.tables.sales.lock();
        let mut returns = self.tables.returns.lock();

        let buyer_name = match sales.get(&ticket) {
            Some(sale) if sale.buyer_id == buyer_id => sale.buyer_name.clone(),
            _ => return Ok(ReturnOutcome::NotOwned),
        };

        let timestamp = self.now();
        let event = JournalEvent::ret(buyer_id, &buyer_name, ticket, timestamp, returned_by);
        if let Err(e) = self.journal(EventKind::Return).append(&event) {
            return Err(StoreError::Unavailable(e));
        }

        sales.remove(&ticket);
        let row = Return {
            ticket,
            buyer_id,
            buyer_name,
            returned_by: returned_by.trim().to_string(),
            timestamp,
        };
        returns.insert(row.key(), row);

        drop(returns);
        drop(sales);
        self.flush(TableKind::Sales);
        self.flush(TableKind::Returns);
        Ok(ReturnOutcome::Returned)
    }

    // === Read-only operations ===

    pub fn user(&self, id: i64) -> Option<User> {
        self.tables.users.get(&id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<User> {
        let canon = canonical(name);
        self.tables
            .users
            .lock()
            .values()
            .find(|u| canonical(&u.name) == canon)
            .cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.tables.users.snapshot()
    }

    /// Tickets reserved for an owner, sorted
    pub fn lot_of(&self, owner: &str) -> Vec<Ticket> {
        let canon = canonical(owner);
        self.tables
            .assignments
            .lock()
            .values()
            .filter(|a| canonical(&a.owner) == canon)
            .map(|a| a.ticket)
            .collect()
    }

    /// Tickets reserved for an owner and not yet sold.
    ///
    /// Takes both locks briefly for a consistent view; never blocks on I/O.
    pub fn available(&self, owner: &str) -> Vec<Ticket> {
        let canon = canonical(owner);
        let assignments = self.tables.assignments.lock();
        let sales = self.tables.sales.lock();
        assignments
            .values()
            .filter(|a| canonical(&a.owner) == canon)
            .map(|a| a.ticket)
            .filter(|ticket| !sales.contains_key(ticket))
            .collect()
    }

    /// Active sales by one buyer, sorted by ticket
    pub fn sold_by(&self, buyer_id: i64) -> Vec<Sale> {
        self.tables
            .sales
            .lock()
            .values()
            .filter(|s| s.buyer_id == buyer_id)
            .cloned()
            .collect()
    }

    /// All returns, in key order (audit listing)
    pub fn returns(&self) -> Vec<Return> {
        self.tables.returns.snapshot()
    }

    /// Total active sales and a per-seller breakdown
    pub fn summary(&self) -> SalesSummary {
        let sales = self.tables.sales.lock();
        let mut by_seller: BTreeMap<String, usize> = BTreeMap::new();
        for sale in sales.values() {
            *by_seller.entry(sale.buyer_name.clone()).or_default() += 1;
        }
        SalesSummary {
            total: sales.len(),
            by_seller,
        }
    }

    // === Range marker (administrative, not concurrency-critical) ===

    pub fn ticket_range(&self) -> Result<Option<TicketRange>, StoreError> {
        let content = match std::fs::read_to_string(self.layout.range_marker()) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match content.trim().parse() {
            Ok(range) => Ok(Some(range)),
            Err(e) => {
                tracing::warn!(%e, "ignoring malformed range marker");
                Ok(None)
            }
        }
    }

    pub fn set_ticket_range(&self, range: TicketRange) -> Result<(), StoreError> {
        std::fs::write(self.layout.range_marker(), format!("{range}\n"))?;
        Ok(())
    }

    // === Administration ===

    /// Full reset: archive both journals to timestamped names, clear every
    /// table, rewrite all snapshots empty.
    pub fn reset(&self) -> Result<ResetReport, StoreError> {
        let stamp = self.now().format("%Y%m%dT%H%M%S").to_string();
        let mut archived = Vec::new();

        {
            // Every lock, in the fixed order, so no operation interleaves
            // with the wipe
            let mut users = self.tables.users.lock();
            let mut assignments = self.tables.assignments.lock();
            let mut sales = self.tables.sales.lock();
            let mut returns = self.tables.returns.lock();

            for kind in [EventKind::Sale, EventKind::Return] {
                let archive = self.layout.journal_archive(kind, &stamp);
                self.journal(kind).rotate(&archive)?;
                archived.push(archive);
            }

            users.clear();
            assignments.clear();
            sales.clear();
            returns.clear();
        }

        // Inline rewrite so the wipe is on disk before we return
        self.flush_sync()?;
        tracing::info!(archives = archived.len(), "store reset");
        Ok(ResetReport {
            archived_journals: archived,
        })
    }

    /// Rewrite every snapshot inline (shutdown/test hook)
    pub fn flush_sync(&self) -> Result<(), StoreError> {
        for kind in TableKind::ALL {
            self.tables
                .write_snapshot(kind, &self.snapshots, &self.layout)?;
        }
        Ok(())
    }

    // === Internal ===

    fn journal(&self, kind: EventKind) -> MutexGuard<'_, Journal> {
        let journal = match kind {
            EventKind::Sale => &self.sales_journal,
            EventKind::Return => &self.returns_journal,
        };
        journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request an asynchronous snapshot flush, degrading to inline when
    /// the worker is unavailable
    fn flush(&self, kind: TableKind) {
        if !self.flusher.request(kind) {
            tracing::warn!(table = kind.file_stem(), "flusher gone; writing snapshot inline");
            if let Err(e) = self.tables.write_snapshot(kind, &self.snapshots, &self.layout) {
                tracing::warn!(%e, table = kind.file_stem(), "inline snapshot flush failed");
            }
        }
    }

    /// Current time at the second precision persisted rows carry
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        let now = self.clock.now();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
