// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::ledger::{
    self, expense_participants, has_pending_request, involves, normalize_name, per_person_share,
    split_count,
};
use crate::models::{Debt, Expense, SettlementStatus};
use crate::store;
use crate::utils::{fmt_money, fmt_timestamp, maybe_print_json, parse_payer, pretty_table};
use anyhow::{Result, bail};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("rm", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim();
            store::delete_expense(conn, id)?;
            println!("Removed expense {}", id);
        }
        _ => {}
    }
    Ok(())
}

/// Build a new expense from CLI input. The total is what was actually paid.
pub fn build_expense(
    conn: &Connection,
    description: &str,
    paid: &[String],
    split: Option<Vec<String>>,
    id: Option<&str>,
) -> Result<Expense> {
    let mut paid_by = BTreeMap::new();
    let mut seen = HashSet::new();
    for p in paid {
        let (name, amount) = parse_payer(p)?;
        if !seen.insert(normalize_name(&name)) {
            bail!("Payer '{}' given more than once", name);
        }
        paid_by.insert(name, amount);
    }
    let total_amount: Decimal = paid_by.values().copied().sum();

    let split_among = match split {
        Some(names) => names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>(),
        None => store::list_friends(conn)?
            .into_iter()
            .map(|f| f.name)
            .collect(),
    };
    if split_among.is_empty() {
        bail!("Nobody to split among; add friends or pass --split NAME");
    }

    let id = match id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id.to_string(),
        None => store::next_expense_id(conn)?,
    };
    Ok(Expense {
        id,
        description: description.trim().to_string(),
        total_amount,
        paid_by,
        split_among,
        settled_by: Vec::new(),
        pending_settlements: Vec::new(),
        payments: Vec::new(),
        timestamp: store::now_millis(),
    })
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let description = sub.get_one::<String>("description").unwrap();
    let paid: Vec<String> = sub
        .get_many::<String>("paid")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let split = sub
        .get_many::<String>("split")
        .map(|v| v.cloned().collect());
    let id = sub.get_one::<String>("id").map(|s| s.as_str());

    let expense = build_expense(conn, description, &paid, split, id)?;
    store::insert_expense(conn, &expense)?;
    let ccy = config::currency(conn)?;
    println!(
        "Added expense {} '{}': {} split {} ways ({} each)",
        expense.id,
        expense.description,
        fmt_money(&expense.total_amount, &ccy),
        split_count(&expense),
        fmt_money(&per_person_share(&expense), &ccy)
    );
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub total: String,
    pub paid_by: String,
    pub split_among: String,
    pub settled_by: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<ExpenseRow>> {
    let involving = sub.get_one::<String>("involving");
    let limit = sub.get_one::<usize>("limit").copied();
    let rows = store::load_expenses(conn)?
        .into_iter()
        .filter(|e| involving.is_none_or(|n| involves(e, n)))
        .take(limit.unwrap_or(usize::MAX))
        .map(|e| ExpenseRow {
            date: fmt_timestamp(e.timestamp),
            total: format!("{:.2}", e.total_amount.round_dp(2)),
            paid_by: e
                .paid_by
                .iter()
                .map(|(n, a)| format!("{}: {}", n, a))
                .collect::<Vec<_>>()
                .join(", "),
            split_among: e.split_among.join(", "),
            settled_by: e.settled_by.join(", "),
            id: e.id,
            description: e.description,
        })
        .collect();
    Ok(rows)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|r| {
                vec![
                    r.id,
                    r.date,
                    r.description,
                    r.total,
                    r.paid_by,
                    r.split_among,
                    r.settled_by,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Description", "Total", "Paid by", "Split among", "Settled"],
                rows
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRow {
    pub name: String,
    pub paid: Decimal,
    pub share: Decimal,
    pub owes: Decimal,
    pub status: SettlementStatus,
    pub settlement_requested: bool,
}

#[derive(Serialize)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub participants: Vec<ParticipantRow>,
    pub debts: Vec<Debt>,
}

pub fn expense_detail(conn: &Connection, id: &str) -> Result<ExpenseDetail> {
    let expense = store::get_expense(conn, id.trim())?;
    let debts = ledger::resolve_expense(&expense);
    let share = per_person_share(&expense);
    let participants = expense_participants(&expense)
        .into_iter()
        .map(|name| {
            let key = normalize_name(&name);
            let paid: Decimal = expense
                .paid_by
                .iter()
                .filter(|(n, _)| normalize_name(n) == key)
                .map(|(_, a)| *a)
                .sum();
            let owes: Decimal = debts
                .iter()
                .filter(|d| normalize_name(&d.debtor) == key)
                .map(|d| d.outstanding)
                .sum();
            ParticipantRow {
                share: if ledger::is_in_split(&expense, &name) {
                    share
                } else {
                    Decimal::ZERO
                },
                status: ledger::expense_settlement_status(&expense, &name),
                settlement_requested: has_pending_request(&expense, &name),
                name,
                paid,
                owes,
            }
        })
        .collect();
    Ok(ExpenseDetail {
        expense,
        participants,
        debts,
    })
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = sub.get_one::<String>("id").unwrap();
    let detail = expense_detail(conn, id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        return Ok(());
    }
    let ccy = config::currency(conn)?;
    let e = &detail.expense;
    println!(
        "{} '{}' on {}: {}",
        e.id,
        e.description,
        fmt_timestamp(e.timestamp),
        fmt_money(&e.total_amount, &ccy)
    );
    let rows = detail
        .participants
        .iter()
        .map(|p| {
            let mut status = p.status.to_string();
            if p.settlement_requested && p.status == SettlementStatus::Pending {
                status.push_str(" (requested)");
            }
            vec![
                p.name.clone(),
                format!("{:.2}", p.paid.round_dp(2)),
                format!("{:.2}", p.share.round_dp(2)),
                format!("{:.2}", p.owes.round_dp(2)),
                status,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Name", "Paid", "Share", "Still owes", "Status"], rows)
    );
    if !detail.debts.is_empty() {
        let rows = detail
            .debts
            .iter()
            .map(|d| {
                vec![
                    d.debtor.clone(),
                    d.creditor.clone(),
                    format!("{:.2}", d.allocated.round_dp(2)),
                    format!("{:.2}", d.paid.round_dp(2)),
                    format!("{:.2}", d.outstanding.round_dp(2)),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["From", "To", "Owed", "Repaid", "Outstanding"], rows)
        );
    }
    Ok(())
}
