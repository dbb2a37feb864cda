// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store configuration and on-disk layout

use crate::journal::EventKind;
use rifa_core::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tuning knobs for journal and snapshot I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Retry policy for journal open/append
    pub journal_retry: RetryPolicy,
    /// Retry policy for the snapshot rename step
    pub snapshot_retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_retry: RetryPolicy::new(5, Duration::from_millis(150)),
            snapshot_retry: RetryPolicy::new(6, Duration::from_millis(250)),
        }
    }
}

impl StoreConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&content)?)
    }
}

/// Paths of everything the store persists under one data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot file for a table (`users.csv`, `sales.csv`, ...)
    pub fn snapshot(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }

    /// Journal file for an event category (`sales.log`, `returns.log`)
    pub fn journal(&self, kind: EventKind) -> PathBuf {
        self.root.join(format!("{}.log", kind.file_stem()))
    }

    /// Archive name a journal rotates to on administrative reset
    pub fn journal_archive(&self, kind: EventKind, stamp: &str) -> PathBuf {
        self.root
            .join(format!("{}-{stamp}.log", kind.file_stem()))
    }

    /// The `start-end` ticket numbering window marker
    pub fn range_marker(&self) -> PathBuf {
        self.root.join("range.txt")
    }

    /// Exclusive single-writer lock file
    pub fn lock_file(&self) -> PathBuf {
        self.root.join("lock")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
