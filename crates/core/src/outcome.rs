// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operation outcomes
//!
//! Business-rule rejections are expected, frequent control-flow results.
//! They are returned as values so callers can report precisely which ticket
//! was refused and why; the error channel is reserved for storage failures.

use serde::Serialize;

/// Result of a sell operation for one ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SellOutcome {
    Sold,
    AlreadySold,
    AssignedToOther { owner: String },
    NotInLot,
}

impl SellOutcome {
    pub fn is_sold(&self) -> bool {
        matches!(self, Self::Sold)
    }
}

/// Result of returning a previously sold ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReturnOutcome {
    Returned,
    NotOwned,
}

/// Result of reserving a ticket for an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AssignOutcome {
    Assigned,
    AlreadyAssignedToSelf,
    Conflict { owner: String },
}

/// Result of removing a reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UnassignOutcome {
    Removed,
    NotAssigned,
}

/// Result of registering a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
    NameTaken,
    InvalidName { reason: String },
}
