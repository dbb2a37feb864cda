// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background snapshot flusher
//!
//! Mutating operations only *request* a snapshot rewrite; a dedicated
//! worker thread performs it from a copy of the rows, so no table lock is
//! ever held across file I/O. Requests for the same table coalesce: a
//! burst of sells costs one rewrite, and whatever lands during a slow
//! flush is captured by the next one.

use crate::config::DataLayout;
use crate::snapshot::SnapshotWriter;
use crate::table::{TableKind, Tables};
use std::collections::BTreeSet;
use std::sync::mpsc::{Receiver, SendError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

pub(crate) struct Flusher {
    tx: Option<Sender<TableKind>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    pub(crate) fn spawn(
        tables: Arc<Tables>,
        writer: SnapshotWriter,
        layout: DataLayout,
    ) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("rifa-flush".to_string())
            .spawn(move || worker(rx, tables, writer, layout))
            .ok();

        if handle.is_none() {
            tracing::warn!("could not spawn flusher thread; snapshots will be written inline");
        }

        Self {
            tx: handle.is_some().then_some(tx),
            handle,
        }
    }

    /// Ask the worker to rewrite one table's snapshot.
    ///
    /// Returns false when no worker is available; the caller then writes
    /// inline so the request is degraded, never lost.
    pub(crate) fn request(&self, kind: TableKind) -> bool {
        match &self.tx {
            Some(tx) => match tx.send(kind) {
                Ok(()) => true,
                Err(SendError(_)) => false,
            },
            None => false,
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain outstanding requests
        // and exit; joining makes the drain observable to the caller.
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker(rx: Receiver<TableKind>, tables: Arc<Tables>, writer: SnapshotWriter, layout: DataLayout) {
    while let Ok(first) = rx.recv() {
        let mut pending = BTreeSet::from([first]);
        while let Ok(more) = rx.try_recv() {
            pending.insert(more);
        }
        for kind in pending {
            if let Err(e) = tables.write_snapshot(kind, &writer, &layout) {
                tracing::warn!(%e, table = kind.file_stem(), "background snapshot flush failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
