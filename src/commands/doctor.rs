// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{expense_participants, normalize_name, split_count};
use crate::models::{Expense, Friend};
use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub expense_id: String,
    pub kind: &'static str,
    pub detail: String,
}

fn collisions<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut by_key: HashMap<String, HashSet<&str>> = HashMap::new();
    for n in names {
        by_key
            .entry(normalize_name(n))
            .or_default()
            .insert(n.as_str());
    }
    let mut out: Vec<String> = by_key
        .into_values()
        .filter(|spellings| spellings.len() > 1)
        .map(|spellings| {
            let mut v: Vec<&str> = spellings.into_iter().collect();
            v.sort();
            v.join(" / ")
        })
        .collect();
    out.sort();
    out
}

/// Records the ledger silently degrades on. An empty friend list skips the
/// directory check.
pub fn diagnose(expenses: &[Expense], friends: &[Friend]) -> Vec<Issue> {
    let directory: HashSet<String> = friends.iter().map(|f| normalize_name(&f.name)).collect();
    let mut issues = Vec::new();
    let mut push = |e: &Expense, kind: &'static str, detail: String| {
        issues.push(Issue {
            expense_id: e.id.clone(),
            kind,
            detail,
        })
    };

    for e in expenses {
        if split_count(e) == 0 {
            push(e, "empty_split", e.description.clone());
        }
        if e.total_amount <= Decimal::ZERO {
            push(e, "non_positive_total", e.total_amount.to_string());
        }
        let paid = e
            .paid_by
            .values()
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(*a));
        match paid {
            Some(paid) if paid == e.total_amount => {}
            Some(paid) => push(
                e,
                "total_mismatch",
                format!("total {} but paid {}", e.total_amount, paid),
            ),
            None => push(
                e,
                "total_mismatch",
                format!("total {} but payer amounts overflow", e.total_amount),
            ),
        }

        let participants = expense_participants(e);
        let known: HashSet<String> = participants.iter().map(|n| normalize_name(n)).collect();
        if !directory.is_empty() {
            for name in &participants {
                if !directory.contains(&normalize_name(name)) {
                    push(e, "unknown_friend", name.clone());
                }
            }
        }
        for name in &e.settled_by {
            if !known.contains(&normalize_name(name)) {
                push(e, "settled_outsider", name.clone());
            }
        }
        for name in &e.pending_settlements {
            if !known.contains(&normalize_name(name)) {
                push(e, "pending_outsider", name.clone());
            }
        }
        for p in &e.payments {
            for name in [&p.from, &p.to] {
                if !known.contains(&normalize_name(name)) {
                    push(e, "payment_outsider", name.clone());
                }
            }
        }
        for c in collisions(e.split_among.iter().chain(e.paid_by.keys())) {
            push(e, "name_collision", c);
        }
    }
    issues
}

pub fn handle(conn: &Connection) -> Result<()> {
    let expenses = store::load_expenses(conn)?;
    let friends = store::list_friends(conn)?;
    let issues = diagnose(&expenses, &friends);

    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.expense_id, i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Expense", "Detail"], rows));
    }
    Ok(())
}
