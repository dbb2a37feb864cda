// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory keyed tables, one exclusive lock each
//!
//! Every read-modify-write that spans a consistency invariant runs inside
//! one lock acquisition; multi-table critical sections in the store take
//! the locks in the fixed order users → assignments → sales → returns.

use crate::config::DataLayout;
use crate::snapshot::{SnapshotError, SnapshotWriter};
use rifa_core::{Assignment, Record, Return, Sale, User};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// An in-memory keyed collection of records for one entity type
#[derive(Debug)]
pub struct Table<R: Record> {
    rows: Mutex<BTreeMap<R::Key, R>>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn from_rows(rows: Vec<R>) -> Self {
        let table = Self::new();
        {
            let mut guard = table.lock();
            for row in rows {
                guard.insert(row.key(), row);
            }
        }
        table
    }

    /// Acquire the table lock. A poisoned lock yields the inner map; the
    /// tables hold plain data and stay usable after a panicking holder.
    pub fn lock(&self) -> MutexGuard<'_, BTreeMap<R::Key, R>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the rows
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut BTreeMap<R::Key, R>) -> T) -> T {
        f(&mut self.lock())
    }

    /// A consistent copy of all rows, in key order
    pub fn snapshot(&self) -> Vec<R> {
        self.lock().values().cloned().collect()
    }

    /// Insert or replace by natural key; returns the previous row
    pub fn upsert(&self, row: R) -> Option<R> {
        self.lock().insert(row.key(), row)
    }

    /// Remove every row matching the predicate; returns the removed rows
    pub fn remove_where(&self, pred: impl Fn(&R) -> bool) -> Vec<R> {
        let mut rows = self.lock();
        let keys: Vec<R::Key> = rows
            .iter()
            .filter(|(_, row)| pred(row))
            .map(|(key, _)| key.clone())
            .collect();
        keys.iter().filter_map(|key| rows.remove(key)).collect()
    }

    pub fn get(&self, key: &R::Key) -> Option<R> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &R::Key) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Which table a snapshot flush targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableKind {
    Users,
    Assignments,
    Sales,
    Returns,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Users,
        TableKind::Assignments,
        TableKind::Sales,
        TableKind::Returns,
    ];

    /// Snapshot file stem
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Users => User::TABLE,
            Self::Assignments => Assignment::TABLE,
            Self::Sales => Sale::TABLE,
            Self::Returns => Return::TABLE,
        }
    }
}

/// The four tables the store owns
#[derive(Debug, Default)]
pub struct Tables {
    pub users: Table<User>,
    pub assignments: Table<Assignment>,
    pub sales: Table<Sale>,
    pub returns: Table<Return>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite one table's snapshot from a consistent copy of its rows.
    ///
    /// The copy is captured under the table lock; the file I/O happens
    /// after the lock is released.
    pub fn write_snapshot(
        &self,
        kind: TableKind,
        writer: &SnapshotWriter,
        layout: &DataLayout,
    ) -> Result<(), SnapshotError> {
        match kind {
            TableKind::Users => write_table(&self.users, writer, layout),
            TableKind::Assignments => write_table(&self.assignments, writer, layout),
            TableKind::Sales => write_table(&self.sales, writer, layout),
            TableKind::Returns => write_table(&self.returns, writer, layout),
        }
    }
}

fn write_table<R: Record>(
    table: &Table<R>,
    writer: &SnapshotWriter,
    layout: &DataLayout,
) -> Result<(), SnapshotError> {
    let rows: Vec<Vec<String>> = table
        .snapshot()
        .iter()
        .map(Record::format_row)
        .collect();
    writer.write(&layout.snapshot(R::TABLE), R::HEADERS, &rows)
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
