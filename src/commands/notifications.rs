// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::notify::message_for;
use crate::store;
use crate::utils::{fmt_timestamp, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("read", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            store::mark_read(conn, id)?;
            println!("Notification {} marked as read", id);
        }
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    // No identity at all means show the whole inbox.
    let to = match sub.get_one::<String>("as") {
        Some(name) => Some(name.trim().to_string()),
        None => config::identity(conn)?,
    };
    let items = store::list_notifications(conn, to.as_deref(), sub.get_flag("unread"))?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
        return Ok(());
    }
    let rows = items
        .iter()
        .map(|n| {
            vec![
                n.id.to_string(),
                fmt_timestamp(n.timestamp),
                n.to_user.clone(),
                message_for(n),
                n.expense_id.clone().unwrap_or_default(),
                if n.read { "yes".into() } else { "no".into() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Id", "When", "To", "Message", "Expense", "Read"], rows)
    );
    Ok(())
}
