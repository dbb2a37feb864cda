// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only journal of mutation intents
//!
//! One journal file per event category (sales, returns). A line is durable
//! before the corresponding in-memory mutation happens, which is the whole
//! crash-recovery story: replay unions journal lines into the snapshots.
//!
//! Line format: `type;user_id;user_name;ticket;timestamp[;extra]`,
//! `type ∈ {sale, return}`. Lines with fewer than five fields, or fields
//! that fail their typed parse, are ignored at replay time.

use chrono::{DateTime, Utc};
use rifa_core::{format_timestamp, parse_timestamp, RetryPolicy, Ticket};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Category of a journal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Sale,
    Return,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Return => "return",
        }
    }

    /// Journal file stem for this category
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Sale => "sales",
            Self::Return => "returns",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(Self::Sale),
            "return" => Some(Self::Return),
            _ => None,
        }
    }
}

/// One durable mutation intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEvent {
    pub kind: EventKind,
    pub user_id: i64,
    pub user_name: String,
    pub ticket: Ticket,
    pub timestamp: DateTime<Utc>,
    /// `returned_by` on return events; unused on sales
    pub extra: Option<String>,
}

impl JournalEvent {
    pub fn sale(user_id: i64, user_name: &str, ticket: Ticket, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Sale,
            user_id,
            user_name: user_name.to_string(),
            ticket,
            timestamp,
            extra: None,
        }
    }

    pub fn ret(
        user_id: i64,
        user_name: &str,
        ticket: Ticket,
        timestamp: DateTime<Utc>,
        returned_by: &str,
    ) -> Self {
        Self {
            kind: EventKind::Return,
            user_id,
            user_name: user_name.to_string(),
            ticket,
            timestamp,
            extra: Some(returned_by.to_string()),
        }
    }

    /// Who took the ticket back. A five-field return line has no extra
    /// field and is attributed to the buyer themselves.
    pub fn returned_by(&self) -> &str {
        self.extra.as_deref().unwrap_or(&self.user_name)
    }

    /// Serialize to one `;`-delimited line (no trailing newline)
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{};{};{};{};{}",
            self.kind.as_str(),
            self.user_id,
            self.user_name,
            self.ticket,
            format_timestamp(&self.timestamp),
        );
        if let Some(extra) = &self.extra {
            line.push(';');
            line.push_str(extra);
        }
        line
    }

    /// Parse one line; `None` for anything malformed
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(6, ';');
        let kind = EventKind::parse(parts.next()?)?;
        let user_id = parts.next()?.trim().parse().ok()?;
        let user_name = parts.next()?.to_string();
        let ticket = parts.next()?.parse().ok()?;
        let timestamp = parse_timestamp(parts.next()?)?;
        let extra = parts.next().map(str::to_string);
        Some(Self {
            kind,
            user_id,
            user_name,
            ticket,
            timestamp,
            extra,
        })
    }
}

/// Append-only journal with fsync-per-append durability
pub struct Journal {
    path: PathBuf,
    file: File,
    retry: RetryPolicy,
    entries_written: u64,
}

impl Journal {
    /// Open or create a journal file for appending
    pub fn open(path: &Path, retry: RetryPolicy) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = retry.run("open journal", || open_append(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            retry,
            entries_written: 0,
        })
    }

    /// Append one event durably.
    ///
    /// The line is flushed and fsync'd before this returns; a retried
    /// attempt may leave a duplicate line behind, which replay tolerates
    /// because it unions by natural key.
    pub fn append(&mut self, event: &JournalEvent) -> Result<(), JournalError> {
        let line = event.to_line();
        let retry = self.retry;
        let file = &mut self.file;
        retry.run("append journal entry", || {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
            file.sync_all()?;
            Ok::<_, io::Error>(())
        })?;
        self.entries_written += 1;
        Ok(())
    }

    /// Entries appended through this handle since open
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotate the current file to `archive` and start a fresh, empty log.
    ///
    /// Used by the administrative reset; the journal is never rewritten in
    /// place.
    pub fn rotate(&mut self, archive: &Path) -> Result<(), JournalError> {
        self.file.sync_all()?;
        std::fs::rename(&self.path, archive)?;
        self.file = open_append(&self.path)?;
        self.entries_written = 0;
        tracing::info!(from = %self.path.display(), to = %archive.display(), "journal rotated");
        Ok(())
    }

    /// Read all events from a journal file.
    ///
    /// A missing file is an empty journal. Malformed lines are skipped and
    /// counted, never fatal.
    pub fn read_events(path: &Path) -> Result<(Vec<JournalEvent>, u64), JournalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut skipped = 0;

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match JournalEvent::parse_line(&line) {
                Some(event) => events.push(event),
                None => {
                    skipped += 1;
                    tracing::warn!(
                        path = %path.display(),
                        line = line_number + 1,
                        "skipping malformed journal line"
                    );
                }
            }
        }

        Ok((events, skipped))
    }
}

fn open_append(path: &Path) -> Result<File, io::Error> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
