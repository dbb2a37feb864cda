// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket numbers, the global numbering window, and ticket-list parsing

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A uniquely numbered distributable item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticket(pub u32);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticket {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Ticket)
    }
}

/// Error parsing a `start-end` range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range {input:?}: expected start-end with two numbers")]
pub struct ParseRangeError {
    pub input: String,
}

/// The inclusive ticket numbering window, persisted as a single
/// `start-end` line in the range marker file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRange {
    pub start: u32,
    pub end: u32,
}

impl TicketRange {
    /// Build a range, normalizing a reversed pair
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, ticket: Ticket) -> bool {
        (self.start..=self.end).contains(&ticket.0)
    }

    /// Number of tickets in the window (inclusive bounds, never zero)
    pub fn count(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl fmt::Display for TicketRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TicketRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRangeError {
            input: s.to_string(),
        };
        let (a, b) = s.trim().split_once('-').ok_or_else(err)?;
        let a: u32 = a.trim().parse().map_err(|_| err())?;
        let b: u32 = b.trim().parse().map_err(|_| err())?;
        Ok(Self::new(a, b))
    }
}

/// Parse free-form ticket-list text into a sorted, deduplicated list.
///
/// Accepts plain numbers and ranges, separated by whitespace or commas:
/// `"1 3,5-8"` → `[1, 3, 5, 6, 7, 8]`. Reversed ranges normalize. A token
/// with non-digit decoration (`"1750.jpg"`) reduces to its digits. Tokens
/// with no digits at all are ignored.
pub fn parse_ticket_list(text: &str) -> Vec<Ticket> {
    let mut out: BTreeSet<u32> = BTreeSet::new();

    for token in text.split([' ', '\t', '\n', ',']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Ok(range) = token.parse::<TicketRange>() {
            out.extend(range.start..=range.end);
        } else if let Ok(n) = token.parse::<u32>() {
            out.insert(n);
        } else {
            let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
            if let Ok(n) = digits.parse::<u32>() {
                out.insert(n);
            }
        }
    }

    out.into_iter().map(Ticket).collect()
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
