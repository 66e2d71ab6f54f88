// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::ledger::{self, normalize_name};
use crate::models::LedgerSummary;
use crate::store;
use crate::utils::{fmt_money, fmt_signed, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle_balance(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let focal = config::resolve_focal(conn, sub.get_one::<String>("as").map(|s| s.as_str()))?;
    let expenses = store::load_expenses(conn)?;
    let summary = ledger::aggregate(&expenses, &focal);
    if !maybe_print_json(json_flag, jsonl_flag, &summary)? {
        print_summary(&summary, &config::currency(conn)?);
    }
    Ok(())
}

pub fn print_summary(s: &LedgerSummary, ccy: &str) {
    let standing = if s.net_balance >= rust_decimal::Decimal::ZERO {
        "Total to recover"
    } else {
        "Total to pay"
    };
    println!(
        "{}",
        pretty_table(
            &["", s.focal.as_str()],
            vec![
                vec!["To receive".into(), fmt_money(&s.to_receive, ccy)],
                vec!["To pay".into(), fmt_money(&s.to_pay, ccy)],
                vec![standing.into(), fmt_money(&s.net_balance.abs(), ccy)],
                vec!["Paid".into(), fmt_money(&s.total_paid, ccy)],
                vec!["Share".into(), fmt_money(&s.total_share, ccy)],
                vec!["Borrowed".into(), fmt_money(&s.total_borrowed, ccy)],
                vec!["Repaid".into(), fmt_money(&s.total_repaid, ccy)],
            ],
        )
    );
    if s.breakdown.is_empty() {
        println!("All settled up.");
        return;
    }
    let rows = s
        .breakdown
        .iter()
        .map(|(name, amount)| {
            let dir = if amount.is_sign_positive() {
                "owes you"
            } else {
                "you owe"
            };
            vec![name.clone(), dir.to_string(), fmt_signed(amount)]
        })
        .collect();
    println!("{}", pretty_table(&["With", "Direction", "Amount"], rows));
}

#[derive(Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub net: String,
    pub status: String,
}

/// Every friend plus the configured identity, in directory order.
pub fn summary_names(conn: &Connection) -> Result<Vec<String>> {
    let mut names: Vec<String> = store::list_friends(conn)?
        .into_iter()
        .map(|f| f.name)
        .collect();
    if let Some(me) = config::identity(conn)? {
        let key = normalize_name(&me);
        if !names.iter().any(|n| normalize_name(n) == key) {
            names.push(me);
        }
    }
    Ok(names)
}

pub fn summary_rows(conn: &Connection) -> Result<Vec<SummaryRow>> {
    let expenses = store::load_expenses(conn)?;
    let names = summary_names(conn)?;
    Ok(ledger::summarize_all(&expenses, &names)
        .into_iter()
        .map(|s| SummaryRow {
            status: if s.net_balance >= rust_decimal::Decimal::ZERO {
                "gets back".into()
            } else {
                "owes".into()
            },
            net: format!("{:.2}", s.net_balance.abs().round_dp(2)),
            name: s.focal,
        })
        .collect())
}

pub fn handle_summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let rows = summary_rows(conn)?;
    if !maybe_print_json(json_flag, jsonl_flag, &rows)? {
        let ccy = config::currency(conn)?;
        let data = rows
            .into_iter()
            .map(|r| vec![r.name, r.status, format!("{} {}", ccy, r.net)])
            .collect();
        println!("{}", pretty_table(&["Name", "Status", "Net"], data));
    }
    Ok(())
}
