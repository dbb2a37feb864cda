// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rifa - ticket distribution ledger CLI
//!
//! A thin collaborator over the store: every subcommand maps onto one
//! store operation. Business rejections print per ticket and exit 0;
//! storage and configuration failures exit non-zero.

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rifa_core::{parse_ticket_list, Ticket, TicketRange};
use rifa_store::{Store, StoreConfig, StoreError};
use std::path::PathBuf;

/// Transparent retries for "storage unavailable" results (the store has
/// already retried the underlying I/O with backoff)
const UNAVAILABLE_RETRIES: u32 = 3;

#[derive(Parser)]
#[command(name = "rifa", version, about = "Ticket distribution ledger")]
struct Cli {
    /// Data directory (defaults to the user-local data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to rifa.toml inside the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user
    Register {
        id: i64,
        name: String,
        #[arg(default_value = "")]
        full_name: String,
    },
    /// Reserve tickets for an owner (numbers and ranges, e.g. `1 3 5-8`)
    Assign {
        owner: String,
        #[arg(required = true)]
        tickets: Vec<String>,
    },
    /// Remove reservations
    Unassign {
        owner: String,
        #[arg(required = true)]
        tickets: Vec<String>,
    },
    /// Sell tickets to a registered buyer
    Sell {
        buyer_id: i64,
        #[arg(required = true)]
        tickets: Vec<String>,
    },
    /// Return sold tickets
    Return {
        buyer_id: i64,
        #[arg(required = true)]
        tickets: Vec<String>,
        /// Who processed the return (defaults to the buyer)
        #[arg(long)]
        by: Option<String>,
    },
    /// Tickets reserved for an owner and not yet sold
    Available { owner: String },
    /// All tickets reserved for an owner
    Lot { owner: String },
    /// Active sales of one buyer
    Sold { buyer_id: i64 },
    /// Registered users
    Users,
    /// Sales totals with a per-seller breakdown
    Summary,
    /// Show the ticket numbering window, or set it from `start-end`
    Range { window: Option<String> },
    /// Archive the journals and clear every table
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => default_data_dir().context("could not determine a data directory; pass --data-dir")?,
    };
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join("rifa.toml"));
    let config = StoreConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    tracing::debug!(data_dir = %data_dir.display(), "opening store");
    let store = Store::open(&data_dir, config)
        .with_context(|| format!("opening store at {}", data_dir.display()))?;

    match cli.command {
        Commands::Register {
            id,
            name,
            full_name,
        } => {
            let outcome = store.register_user(id, &name, &full_name)?;
            output::register(cli.json, &name, &outcome)?;
        }

        Commands::Assign { owner, tickets } => {
            let mut results = Vec::new();
            for ticket in parse_tickets(&tickets)? {
                results.push((ticket, store.assign(&owner, ticket)?));
            }
            output::assign(cli.json, &results)?;
        }

        Commands::Unassign { owner, tickets } => {
            let mut results = Vec::new();
            for ticket in parse_tickets(&tickets)? {
                results.push((ticket, store.unassign(&owner, ticket)?));
            }
            output::unassign(cli.json, &results)?;
        }

        Commands::Sell { buyer_id, tickets } => {
            let buyer = store
                .user(buyer_id)
                .with_context(|| format!("buyer {buyer_id} is not registered"))?;
            let mut results = Vec::new();
            for ticket in parse_tickets(&tickets)? {
                let outcome =
                    retry_unavailable(|| store.sell(buyer_id, &buyer.name, ticket))?;
                results.push((ticket, outcome));
            }
            output::sell(cli.json, &results)?;
        }

        Commands::Return {
            buyer_id,
            tickets,
            by,
        } => {
            let buyer = store
                .user(buyer_id)
                .with_context(|| format!("buyer {buyer_id} is not registered"))?;
            let returned_by = by.unwrap_or_else(|| buyer.name.clone());
            let mut results = Vec::new();
            for ticket in parse_tickets(&tickets)? {
                let outcome =
                    retry_unavailable(|| store.return_ticket(buyer_id, ticket, &returned_by))?;
                results.push((ticket, outcome));
            }
            output::ret(cli.json, &results)?;
        }

        Commands::Available { owner } => {
            output::tickets(cli.json, "available", &store.available(&owner))?;
        }

        Commands::Lot { owner } => {
            output::tickets(cli.json, "lot", &store.lot_of(&owner))?;
        }

        Commands::Sold { buyer_id } => {
            output::sales(cli.json, &store.sold_by(buyer_id))?;
        }

        Commands::Users => {
            output::users(cli.json, &store.users())?;
        }

        Commands::Summary => {
            output::summary(cli.json, &store.summary())?;
        }

        Commands::Range { window } => match window {
            Some(text) => {
                let range: TicketRange = text
                    .parse()
                    .with_context(|| format!("invalid range {text:?}; expected start-end"))?;
                store.set_ticket_range(range)?;
                output::range(cli.json, Some(&range), true)?;
            }
            None => {
                let range = store.ticket_range()?;
                output::range(cli.json, range.as_ref(), false)?;
            }
        },

        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to wipe the store without --yes");
            }
            let report = store.reset()?;
            output::reset(cli.json, &report)?;
        }
    }

    Ok(())
}

fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("rifa"))
}

/// Expand ticket-list arguments (`7`, `1 3 5-8`, `1,3`) into tickets
fn parse_tickets(args: &[String]) -> Result<Vec<Ticket>> {
    let tickets = parse_ticket_list(&args.join(" "));
    if tickets.is_empty() {
        bail!("no valid ticket numbers in {:?}", args.join(" "));
    }
    Ok(tickets)
}

/// Retry an operation a few times when storage reports unavailable
fn retry_unavailable<T>(mut f: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
    let mut attempt = 1;
    loop {
        match f() {
            Err(StoreError::Unavailable(e)) if attempt < UNAVAILABLE_RETRIES => {
                tracing::warn!(%e, attempt, "storage unavailable; retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}
