// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable and JSON rendering of store results

use anyhow::Result;
use rifa_core::{
    AssignOutcome, RegisterOutcome, ReturnOutcome, Sale, SellOutcome, Ticket, TicketRange,
    UnassignOutcome, User,
};
use rifa_store::{ResetReport, SalesSummary};
use serde_json::json;

/// One `{"ticket": N, ...outcome}` object per ticket
fn ticket_objects<O: serde::Serialize>(results: &[(Ticket, O)]) -> Result<serde_json::Value> {
    let mut items = Vec::with_capacity(results.len());
    for (ticket, outcome) in results {
        let mut object = serde_json::to_value(outcome)?;
        if let Some(map) = object.as_object_mut() {
            map.insert("ticket".to_string(), json!(ticket));
        }
        items.push(object);
    }
    Ok(serde_json::Value::Array(items))
}

fn emit(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn register(json: bool, name: &str, outcome: &RegisterOutcome) -> Result<()> {
    if json {
        return emit(serde_json::to_value(outcome)?);
    }
    match outcome {
        RegisterOutcome::Registered => println!("Registered {name}"),
        RegisterOutcome::AlreadyRegistered => println!("That id is already registered"),
        RegisterOutcome::NameTaken => println!("The name {name} is already taken"),
        RegisterOutcome::InvalidName { reason } => println!("Invalid name: {reason}"),
    }
    Ok(())
}

pub fn assign(json: bool, results: &[(Ticket, AssignOutcome)]) -> Result<()> {
    if json {
        return emit(ticket_objects(results)?);
    }
    for (ticket, outcome) in results {
        match outcome {
            AssignOutcome::Assigned => println!("{ticket}: assigned"),
            AssignOutcome::AlreadyAssignedToSelf => println!("{ticket}: already yours"),
            AssignOutcome::Conflict { owner } => println!("{ticket}: assigned to {owner}"),
        }
    }
    Ok(())
}

pub fn unassign(json: bool, results: &[(Ticket, UnassignOutcome)]) -> Result<()> {
    if json {
        return emit(ticket_objects(results)?);
    }
    for (ticket, outcome) in results {
        match outcome {
            UnassignOutcome::Removed => println!("{ticket}: removed"),
            UnassignOutcome::NotAssigned => println!("{ticket}: not assigned to that owner"),
        }
    }
    Ok(())
}

pub fn sell(json: bool, results: &[(Ticket, SellOutcome)]) -> Result<()> {
    if json {
        return emit(ticket_objects(results)?);
    }
    for (ticket, outcome) in results {
        match outcome {
            SellOutcome::Sold => println!("{ticket}: sold"),
            SellOutcome::AlreadySold => println!("{ticket}: already sold"),
            SellOutcome::AssignedToOther { owner } => println!("{ticket}: assigned to {owner}"),
            SellOutcome::NotInLot => println!("{ticket}: outside your lot"),
        }
    }
    Ok(())
}

pub fn ret(json: bool, results: &[(Ticket, ReturnOutcome)]) -> Result<()> {
    if json {
        return emit(ticket_objects(results)?);
    }
    for (ticket, outcome) in results {
        match outcome {
            ReturnOutcome::Returned => println!("{ticket}: returned"),
            ReturnOutcome::NotOwned => println!("{ticket}: not sold to that buyer"),
        }
    }
    Ok(())
}

pub fn tickets(json: bool, label: &str, tickets: &[Ticket]) -> Result<()> {
    if json {
        let mut object = serde_json::Map::new();
        object.insert(label.to_string(), serde_json::to_value(tickets)?);
        return emit(serde_json::Value::Object(object));
    }
    if tickets.is_empty() {
        println!("none");
    } else {
        let list: Vec<String> = tickets.iter().map(Ticket::to_string).collect();
        println!("{}", list.join(", "));
    }
    Ok(())
}

pub fn sales(json: bool, sales: &[Sale]) -> Result<()> {
    if json {
        return emit(serde_json::to_value(sales)?);
    }
    if sales.is_empty() {
        println!("No sales");
        return Ok(());
    }
    println!("{:<8} {:<20} SOLD AT", "TICKET", "BUYER");
    for sale in sales {
        println!(
            "{:<8} {:<20} {}",
            sale.ticket.to_string(),
            sale.buyer_name,
            sale.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn users(json: bool, users: &[User]) -> Result<()> {
    if json {
        return emit(serde_json::to_value(users)?);
    }
    if users.is_empty() {
        println!("No users registered");
        return Ok(());
    }
    for user in users {
        println!("{} ({})", user.name, user.id);
    }
    Ok(())
}

pub fn summary(json: bool, summary: &SalesSummary) -> Result<()> {
    if json {
        return emit(serde_json::to_value(summary)?);
    }
    println!("Total sold: {}", summary.total);
    for (seller, count) in &summary.by_seller {
        println!("  {seller}: {count}");
    }
    Ok(())
}

pub fn range(json: bool, range: Option<&TicketRange>, updated: bool) -> Result<()> {
    if json {
        return emit(json!({ "range": range.map(ToString::to_string), "updated": updated }));
    }
    match range {
        Some(range) if updated => println!("Range updated to {range}"),
        Some(range) => println!("Current range: {range}"),
        None => println!("No range defined"),
    }
    Ok(())
}

pub fn reset(json: bool, report: &ResetReport) -> Result<()> {
    if json {
        return emit(json!({
            "archived_journals": report
                .archived_journals
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
        }));
    }
    println!("Store reset; archived journals:");
    for path in &report.archived_journals {
        println!("  {}", path.display());
    }
    Ok(())
}
