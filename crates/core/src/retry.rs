// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with linear backoff
//!
//! The single retry utility shared by the journal and the snapshot writer.
//! Both layers face the same hostile-filesystem condition (a file held open
//! by another application), so the policy lives in one place and the
//! attempt counts and delays come from configuration.

use serde::Deserialize;
use std::fmt::Display;
use std::time::Duration;

/// Attempt count and base delay for one retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Run `f` until it succeeds or the attempt budget is spent.
    ///
    /// Backoff is linear: the delay before attempt `n + 1` is
    /// `base_delay * n`. The last error is returned once attempts exhaust;
    /// the call never blocks indefinitely.
    pub fn run<T, E: Display>(
        &self,
        what: &str,
        mut f: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let delay = self.base_delay * attempt;
                    tracing::warn!(%e, what, attempt, ?delay, "retrying after failure");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(%e, what, attempts, "giving up after final attempt");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
