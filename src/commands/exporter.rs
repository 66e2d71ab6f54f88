// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use anyhow::{Context, Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expenses", sub)) => export_expenses(conn, sub),
        _ => Ok(()),
    }
}

fn export_expenses(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();

    // oldest first, so an import replays in creation order
    let mut expenses = store::load_expenses(conn)?;
    expenses.reverse();

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Failed to create {}", out))?;
            wtr.write_record([
                "id",
                "timestamp",
                "description",
                "total_amount",
                "paid_by",
                "split_among",
                "settled_by",
                "pending_settlements",
                "payments",
            ])?;
            for e in &expenses {
                let paid_by = e
                    .paid_by
                    .iter()
                    .map(|(n, a)| format!("{}={}", n, a))
                    .collect::<Vec<_>>()
                    .join(";");
                let payments = e
                    .payments
                    .iter()
                    .map(|p| format!("{}>{}={}", p.from, p.to, p.amount))
                    .collect::<Vec<_>>()
                    .join(";");
                wtr.write_record([
                    e.id.clone(),
                    e.timestamp.to_string(),
                    e.description.clone(),
                    e.total_amount.to_string(),
                    paid_by,
                    e.split_among.join(";"),
                    e.settled_by.join(";"),
                    e.pending_settlements.join(";"),
                    payments,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&expenses)?)
                .with_context(|| format!("Failed to write {}", out))?;
        }
        _ => bail!("Unknown format: {} (use csv|json)", fmt),
    }
    println!("Exported {} expenses to {}", expenses.len(), out);
    Ok(())
}
