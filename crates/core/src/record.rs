// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed table records with strict parsing and total formatting
//!
//! Every persisted table (users, assignments, sales, returns) has one record
//! type here. The journal and snapshot layers format and parse rows only
//! through these definitions, so a malformed line is rejected in exactly one
//! place and callers can skip-and-count instead of crashing.

use crate::ticket::Ticket;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Timestamp layout used in journal lines and snapshot rows
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a timestamp the way persisted rows carry it (UTC, second precision)
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp; `None` for anything but the exact layout
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

/// Canonical form of a display name for case-insensitive comparison
pub fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Why a display name was rejected at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name contains a reserved character ({0:?})")]
    ReservedChar(char),
}

/// Validate a display name before it enters the users table.
///
/// Field delimiters and newlines are rejected here so the persisted
/// journal/snapshot rows stay parseable.
pub fn validate_display_name(name: &str) -> Result<(), NameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    for c in [';', ',', '\n', '\r', '"'] {
        if name.contains(c) {
            return Err(NameError::ReservedChar(c));
        }
    }
    Ok(())
}

/// A row failed strict parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{table}: expected {expected} fields, got {got}")]
    Arity {
        table: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{table}: invalid {field}: {value:?}")]
    Field {
        table: &'static str,
        field: &'static str,
        value: String,
    },
}

impl ParseError {
    fn field(table: &'static str, field: &'static str, value: &str) -> Self {
        Self::Field {
            table,
            field,
            value: value.to_string(),
        }
    }
}

/// A typed row of one persisted table
pub trait Record: Sized + Clone + Send + 'static {
    /// Table name; also the snapshot file stem
    const TABLE: &'static str;
    /// Snapshot header fields, in column order
    const HEADERS: &'static [&'static str];
    /// Natural key of the in-memory table
    type Key: Ord + Clone + Send + std::fmt::Debug;

    fn key(&self) -> Self::Key;

    /// Format as an ordered field sequence; total for any valid record
    fn format_row(&self) -> Vec<String>;

    /// Strict parse of an ordered field sequence
    fn parse_row(fields: &[String]) -> Result<Self, ParseError>;
}

fn check_arity(table: &'static str, expected: usize, fields: &[String]) -> Result<(), ParseError> {
    if fields.len() != expected {
        return Err(ParseError::Arity {
            table,
            expected,
            got: fields.len(),
        });
    }
    Ok(())
}

/// A registered human actor with a stable external id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub full_name: String,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const HEADERS: &'static [&'static str] = &["user_id", "user_name", "full_name"];
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn format_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.full_name.clone(),
        ]
    }

    fn parse_row(fields: &[String]) -> Result<Self, ParseError> {
        check_arity(Self::TABLE, 3, fields)?;
        let id = fields[0]
            .trim()
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "user_id", &fields[0]))?;
        Ok(Self {
            id,
            name: fields[1].clone(),
            full_name: fields[2].clone(),
        })
    }
}

/// A reservation binding one ticket to one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub owner: String,
    pub ticket: Ticket,
}

impl Record for Assignment {
    const TABLE: &'static str = "assignments";
    const HEADERS: &'static [&'static str] = &["owner", "ticket"];
    type Key = Ticket;

    fn key(&self) -> Ticket {
        self.ticket
    }

    fn format_row(&self) -> Vec<String> {
        vec![self.owner.clone(), self.ticket.to_string()]
    }

    fn parse_row(fields: &[String]) -> Result<Self, ParseError> {
        check_arity(Self::TABLE, 2, fields)?;
        let ticket = fields[1]
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "ticket", &fields[1]))?;
        Ok(Self {
            owner: fields[0].clone(),
            ticket,
        })
    }
}

/// The active record of a ticket having been sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sale {
    pub ticket: Ticket,
    pub buyer_id: i64,
    pub buyer_name: String,
    pub timestamp: DateTime<Utc>,
    pub returned_by: Option<String>,
}

impl Record for Sale {
    const TABLE: &'static str = "sales";
    const HEADERS: &'static [&'static str] =
        &["ticket", "buyer_id", "buyer_name", "timestamp", "returned_by"];
    type Key = Ticket;

    fn key(&self) -> Ticket {
        self.ticket
    }

    fn format_row(&self) -> Vec<String> {
        vec![
            self.ticket.to_string(),
            self.buyer_id.to_string(),
            self.buyer_name.clone(),
            format_timestamp(&self.timestamp),
            self.returned_by.clone().unwrap_or_default(),
        ]
    }

    fn parse_row(fields: &[String]) -> Result<Self, ParseError> {
        check_arity(Self::TABLE, 5, fields)?;
        let ticket = fields[0]
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "ticket", &fields[0]))?;
        let buyer_id = fields[1]
            .trim()
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "buyer_id", &fields[1]))?;
        let timestamp = parse_timestamp(&fields[3])
            .ok_or_else(|| ParseError::field(Self::TABLE, "timestamp", &fields[3]))?;
        let returned_by = if fields[4].is_empty() {
            None
        } else {
            Some(fields[4].clone())
        };
        Ok(Self {
            ticket,
            buyer_id,
            buyer_name: fields[2].clone(),
            timestamp,
            returned_by,
        })
    }
}

/// The immutable audit record of a sold ticket being given back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Return {
    pub ticket: Ticket,
    pub buyer_id: i64,
    pub buyer_name: String,
    pub returned_by: String,
    pub timestamp: DateTime<Utc>,
}

impl Record for Return {
    const TABLE: &'static str = "returns";
    const HEADERS: &'static [&'static str] =
        &["ticket", "buyer_id", "buyer_name", "returned_by", "timestamp"];
    // Timestamp is part of the key so repeated sell/return cycles of the
    // same ticket keep distinct audit rows.
    type Key = (Ticket, i64, DateTime<Utc>);

    fn key(&self) -> Self::Key {
        (self.ticket, self.buyer_id, self.timestamp)
    }

    fn format_row(&self) -> Vec<String> {
        vec![
            self.ticket.to_string(),
            self.buyer_id.to_string(),
            self.buyer_name.clone(),
            self.returned_by.clone(),
            format_timestamp(&self.timestamp),
        ]
    }

    fn parse_row(fields: &[String]) -> Result<Self, ParseError> {
        check_arity(Self::TABLE, 5, fields)?;
        let ticket = fields[0]
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "ticket", &fields[0]))?;
        let buyer_id = fields[1]
            .trim()
            .parse()
            .map_err(|_| ParseError::field(Self::TABLE, "buyer_id", &fields[1]))?;
        let timestamp = parse_timestamp(&fields[4])
            .ok_or_else(|| ParseError::field(Self::TABLE, "timestamp", &fields[4]))?;
        Ok(Self {
            ticket,
            buyer_id,
            buyer_name: fields[2].clone(),
            returned_by: fields[3].clone(),
            timestamp,
        })
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
