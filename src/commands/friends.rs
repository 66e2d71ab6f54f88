// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::balance::print_summary;
use crate::config;
use crate::errors::StoreError;
use crate::ledger::{self, has_pending_request, involves, per_person_share};
use crate::models::{Friend, LedgerSummary, SettlementStatus};
use crate::store;
use crate::utils::{fmt_timestamp, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let phone = sub.get_one::<String>("phone").map(|s| s.trim());
            let image = sub.get_one::<String>("image").map(|s| s.trim());
            let f = store::add_friend(conn, name, image, phone)?;
            println!("Added friend '{}'", f.name);
        }
        Some(("list", sub)) => {
            let friends = store::list_friends(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &friends)? {
                let rows = friends
                    .into_iter()
                    .map(|f| {
                        vec![
                            f.id.to_string(),
                            f.name,
                            f.phone.unwrap_or_default(),
                            f.image.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Id", "Name", "Phone", "Image"], rows));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            store::remove_friend(conn, name)?;
            println!("Removed friend '{}'", name.trim());
        }
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatusRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub total: String,
    pub share: String,
    pub status: SettlementStatus,
    pub settlement_requested: bool,
}

#[derive(Serialize)]
pub struct FriendDetail {
    pub friend: Friend,
    pub summary: LedgerSummary,
    pub expenses: Vec<ExpenseStatusRow>,
}

pub fn friend_detail(conn: &Connection, name: &str) -> Result<FriendDetail> {
    let friend = store::find_friend(conn, name)?.ok_or_else(|| StoreError::FriendNotFound {
        name: name.trim().to_string(),
    })?;
    let expenses = store::load_expenses(conn)?;
    let summary = ledger::aggregate(&expenses, &friend.name);
    let rows = expenses
        .iter()
        .filter(|e| involves(e, &friend.name))
        .map(|e| ExpenseStatusRow {
            id: e.id.clone(),
            date: fmt_timestamp(e.timestamp),
            description: e.description.clone(),
            total: format!("{:.2}", e.total_amount.round_dp(2)),
            share: format!("{:.2}", per_person_share(e).round_dp(2)),
            status: ledger::expense_settlement_status(e, &friend.name),
            settlement_requested: has_pending_request(e, &friend.name),
        })
        .collect();
    Ok(FriendDetail {
        friend,
        summary,
        expenses: rows,
    })
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let detail = friend_detail(conn, name)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        return Ok(());
    }
    print_summary(&detail.summary, &config::currency(conn)?);
    let rows = detail
        .expenses
        .into_iter()
        .map(|r| {
            let status = if r.settlement_requested && r.status == SettlementStatus::Pending {
                "PENDING (requested)".to_string()
            } else {
                r.status.to_string()
            };
            vec![r.id, r.date, r.description, r.total, r.share, status]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Id", "Date", "Description", "Total", "Share", "Status"],
            rows
        )
    );
    Ok(())
}
