// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Expense;
use crate::store;
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expenses", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let (added, skipped) = import_expenses(conn, path)?;
            println!("Imported {} expenses ({} already present)", added, skipped);
        }
        _ => {}
    }
    Ok(())
}

/// Load a JSON array of expenses in one transaction. Existing ids are left untouched.
pub fn import_expenses(conn: &Connection, path: &str) -> Result<(usize, usize)> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Read {}", path))?;
    let expenses: Vec<Expense> =
        serde_json::from_str(&raw).with_context(|| format!("Parse expenses from {}", path))?;

    let (added, skipped) = store::import_expenses(conn, &expenses)
        .with_context(|| format!("Import expenses from {}", path))?;
    info!(path, added, skipped, "import finished");
    Ok((added, skipped))
}
