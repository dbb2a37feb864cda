// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rifa_core::{Assignment, RetryPolicy, Ticket};
use std::time::Duration;
use tempfile::TempDir;

fn setup() -> (TempDir, Arc<Tables>, SnapshotWriter, DataLayout) {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    let writer = SnapshotWriter::new(RetryPolicy::new(2, Duration::from_millis(1)));
    (dir, Arc::new(Tables::new()), writer, layout)
}

#[test]
fn requested_flush_is_written_by_drop_time() {
    let (_dir, tables, writer, layout) = setup();
    tables.assignments.upsert(Assignment {
        owner: "ana".to_string(),
        ticket: Ticket(7),
    });

    {
        let flusher = Flusher::spawn(tables.clone(), writer, layout.clone());
        assert!(flusher.request(TableKind::Assignments));
        // Drop drains the queue and joins the worker
    }

    let content = std::fs::read_to_string(layout.snapshot("assignments")).unwrap();
    assert_eq!(content, "owner,ticket\nana,7\n");
}

#[test]
fn burst_of_requests_coalesces_without_losing_tables() {
    let (_dir, tables, writer, layout) = setup();
    tables.assignments.upsert(Assignment {
        owner: "ana".to_string(),
        ticket: Ticket(1),
    });

    {
        let flusher = Flusher::spawn(tables.clone(), writer, layout.clone());
        for _ in 0..100 {
            assert!(flusher.request(TableKind::Assignments));
            assert!(flusher.request(TableKind::Users));
        }
    }

    assert!(layout.snapshot("assignments").exists());
    assert!(layout.snapshot("users").exists());
}

#[test]
fn flush_captures_state_at_write_time() {
    let (_dir, tables, writer, layout) = setup();

    {
        let flusher = Flusher::spawn(tables.clone(), writer, layout.clone());
        tables.assignments.upsert(Assignment {
            owner: "ana".to_string(),
            ticket: Ticket(1),
        });
        flusher.request(TableKind::Assignments);
        // A mutation racing the flush is captured by this later request
        tables.assignments.upsert(Assignment {
            owner: "luis".to_string(),
            ticket: Ticket(2),
        });
        flusher.request(TableKind::Assignments);
    }

    let content = std::fs::read_to_string(layout.snapshot("assignments")).unwrap();
    assert!(content.contains("ana,1"));
    assert!(content.contains("luis,2"));
}
