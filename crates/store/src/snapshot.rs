// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic whole-table snapshot files
//!
//! A snapshot rewrite never leaves a truncated or interleaved artifact
//! visible: rows go to a temp file in the target's directory, the temp is
//! fsync'd, and an atomic rename publishes it. When the rename fails
//! because another application holds the target open, only the rename is
//! retried; the previous snapshot stays intact until a rename succeeds.
//!
//! File format: UTF-8 text, first line header field names, one row per
//! line, comma-separated with minimal RFC-4180 quoting.

use rifa_core::{ParseError, Record, RetryPolicy};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Writes whole-table snapshots with rename-retry semantics
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    retry: RetryPolicy,
}

impl SnapshotWriter {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Rewrite `path` with the given header and rows.
    ///
    /// On failure the previous snapshot is left untouched and the temp
    /// file is removed.
    pub fn write(
        &self,
        path: &Path,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), SnapshotError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        // Temp file lives next to the target so the rename stays within
        // one filesystem and therefore atomic.
        let temp = parent.join(format!(
            ".{}.{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("snapshot"),
            uuid::Uuid::new_v4()
        ));

        let result = self.write_and_publish(&temp, path, headers, rows);
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    fn write_and_publish(
        &self,
        temp: &Path,
        path: &Path,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), SnapshotError> {
        {
            let mut file = File::create(temp)?;
            let mut buf = String::new();
            buf.push_str(&format_line(headers));
            for row in rows {
                buf.push_str(&format_line(row));
            }
            file.write_all(buf.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }

        // The rename alone is retried: a spreadsheet application holding
        // the target open can block it long after the data is safely on
        // disk in the temp file.
        self.retry
            .run("rename snapshot", || fs::rename(temp, path))?;
        Ok(())
    }
}

/// Format one row as a CSV line with trailing newline
fn format_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        if i > 0 {
            line.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}

/// Split one CSV line into fields; `None` on an unterminated quote
fn split_line(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => quoted = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' if current.is_empty() => quoted = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }

    if quoted {
        return None;
    }
    fields.push(current);
    Some(fields)
}

/// Load typed records from a snapshot file.
///
/// A missing file is an empty table. The header line is skipped; rows that
/// fail CSV splitting or the strict record parse are skipped and counted.
pub fn read_records<R: Record>(path: &Path) -> Result<(Vec<R>, u64), SnapshotError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line_number == 0 || line.trim().is_empty() {
            continue;
        }
        let parsed = split_line(&line).map(|fields| R::parse_row(&fields));
        match parsed {
            Some(Ok(record)) => records.push(record),
            Some(Err(e)) => {
                skipped += 1;
                warn_skipped(path, line_number + 1, &e);
            }
            None => {
                skipped += 1;
                tracing::warn!(
                    path = %path.display(),
                    line = line_number + 1,
                    "skipping snapshot row with unterminated quote"
                );
            }
        }
    }

    Ok((records, skipped))
}

fn warn_skipped(path: &Path, line: usize, error: &ParseError) {
    tracing::warn!(path = %path.display(), line, %error, "skipping malformed snapshot row");
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
