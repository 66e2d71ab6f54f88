// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Debt resolution over a snapshot of expenses.
//!
//! Everything here is pure: callers load expenses from the store and pass
//! them in, and get values back. Malformed records (empty split, non-positive
//! total, unknown names) contribute nothing instead of failing, because the
//! store accepts whatever other devices wrote.
//!
//! Participants are identified by display name, compared after trimming and
//! lower-casing. See [`normalize_name`].

use crate::models::{Balance, Debt, Expense, LedgerSummary, Payment, SettlementStatus};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Balances with `|b| <= 0.01` are treated as settled for the expense.
pub const SETTLE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Payments within one unit of the share count as a full repayment.
pub const STATUS_TOLERANCE: Decimal = Decimal::ONE;
/// Rounded breakdown entries smaller than this are dropped.
pub const BREAKDOWN_MIN: Decimal = Decimal::ONE;

/// Per-expense balances keyed by normalized name.
pub type Balances = BTreeMap<String, Balance>;

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Round to the nearest whole unit, halves away from zero.
pub fn round_unit(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Distinct split members in order, as `(key, display name)`.
fn split_members(expense: &Expense) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in &expense.split_among {
        let key = normalize_name(name);
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        out.push((key, name.trim().to_string()));
    }
    out
}

pub fn split_count(expense: &Expense) -> usize {
    split_members(expense).len()
}

/// Equal share per consuming participant. Zero for degenerate expenses.
pub fn per_person_share(expense: &Expense) -> Decimal {
    let n = split_count(expense);
    if n == 0 || expense.total_amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    expense
        .total_amount
        .checked_div(Decimal::from(n as u64))
        .unwrap_or(Decimal::ZERO)
}

pub fn is_in_split(expense: &Expense, name: &str) -> bool {
    let key = normalize_name(name);
    split_members(expense).iter().any(|(k, _)| *k == key)
}

pub fn is_payer(expense: &Expense, name: &str) -> bool {
    let key = normalize_name(name);
    expense.paid_by.keys().any(|p| normalize_name(p) == key)
}

/// True when the person paid for or shares this expense.
pub fn involves(expense: &Expense, name: &str) -> bool {
    is_payer(expense, name) || is_in_split(expense, name)
}

pub fn has_pending_request(expense: &Expense, name: &str) -> bool {
    contains_name(&expense.pending_settlements, name)
}

pub fn contains_name(names: &[String], name: &str) -> bool {
    let key = normalize_name(name);
    names.iter().any(|n| normalize_name(n) == key)
}

/// Split members in order, followed by payers who are not consumers.
pub fn expense_participants(expense: &Expense) -> Vec<String> {
    let mut keys = HashSet::new();
    let mut out = Vec::new();
    for (key, display) in split_members(expense) {
        keys.insert(key);
        out.push(display);
    }
    for payer in expense.paid_by.keys() {
        let key = normalize_name(payer);
        if !key.is_empty() && keys.insert(key) {
            out.push(payer.trim().to_string());
        }
    }
    out
}

fn paid_amount(expense: &Expense, key: &str) -> Decimal {
    expense
        .paid_by
        .iter()
        .filter(|(name, amount)| normalize_name(name) == key && **amount > Decimal::ZERO)
        .map(|(_, amount)| *amount)
        .sum()
}

/// `paid - share` for everyone who paid or consumes.
///
/// Payer keys colliding after normalization are summed; non-positive payer
/// amounts are ignored. Empty split or non-positive total yields no balances.
pub fn compute_expense_balances(expense: &Expense) -> Balances {
    let mut out = Balances::new();
    let share = per_person_share(expense);
    if share.is_zero() {
        debug!(expense = %expense.id, "skipping degenerate expense");
        return out;
    }

    for (key, display) in split_members(expense) {
        out.entry(key)
            .or_insert_with(|| Balance {
                name: display,
                amount: Decimal::ZERO,
            })
            .amount -= share;
    }
    for (name, amount) in &expense.paid_by {
        let key = normalize_name(name);
        if key.is_empty() || *amount <= Decimal::ZERO {
            continue;
        }
        out.entry(key)
            .or_insert_with(|| Balance {
                name: name.trim().to_string(),
                amount: Decimal::ZERO,
            })
            .amount += *amount;
    }
    out
}

/// Spread every debtor's deficit over the creditors in proportion to each
/// creditor's part of the total surplus.
///
/// Debtors listed in `settled` get a zero outstanding amount but keep their
/// allocation so repaid totals can be reported. Other debtors have payments on
/// the exact debtor -> creditor pair subtracted, floored at zero.
pub fn distribute_debts(balances: &Balances, settled: &[String], payments: &[Payment]) -> Vec<Debt> {
    let settled: HashSet<String> = settled.iter().map(|n| normalize_name(n)).collect();

    let creditors: Vec<(&String, &Balance)> = balances
        .iter()
        .filter(|(_, b)| b.amount > SETTLE_EPSILON)
        .collect();
    let debtors: Vec<(&String, &Balance)> = balances
        .iter()
        .filter(|(_, b)| b.amount < -SETTLE_EPSILON)
        .collect();

    let total_surplus: Decimal = creditors.iter().map(|(_, b)| b.amount).sum();
    if total_surplus <= Decimal::ZERO {
        return Vec::new();
    }

    let mut paid_pairs: HashMap<(String, String), Decimal> = HashMap::new();
    for p in payments.iter().filter(|p| p.amount > Decimal::ZERO) {
        *paid_pairs
            .entry((normalize_name(&p.from), normalize_name(&p.to)))
            .or_insert(Decimal::ZERO) += p.amount;
    }

    let mut debts = Vec::with_capacity(debtors.len() * creditors.len());
    for (debtor_key, debtor) in &debtors {
        let deficit = -debtor.amount;
        let is_settled = settled.contains(*debtor_key);
        for (creditor_key, creditor) in &creditors {
            let weight = creditor
                .amount
                .checked_div(total_surplus)
                .unwrap_or(Decimal::ZERO);
            let allocated = deficit * weight;
            let paid = paid_pairs
                .get(&((*debtor_key).clone(), (*creditor_key).clone()))
                .copied()
                .unwrap_or(Decimal::ZERO);
            let outstanding = if is_settled {
                Decimal::ZERO
            } else {
                (allocated - paid).max(Decimal::ZERO)
            };
            debts.push(Debt {
                debtor: debtor.name.clone(),
                creditor: creditor.name.clone(),
                allocated,
                paid,
                outstanding,
                settled: is_settled,
            });
        }
    }
    debts
}

/// Balances and debts for a single expense.
pub fn resolve_expense(expense: &Expense) -> Vec<Debt> {
    let balances = compute_expense_balances(expense);
    distribute_debts(&balances, &expense.settled_by, &expense.payments)
}

/// Last occurrence of each id wins.
fn dedupe_by_id(expenses: &[Expense]) -> Vec<&Expense> {
    let mut last: HashMap<&str, usize> = HashMap::new();
    for (i, e) in expenses.iter().enumerate() {
        last.insert(e.id.as_str(), i);
    }
    expenses
        .iter()
        .enumerate()
        .filter(|(i, e)| last.get(e.id.as_str()) == Some(i))
        .map(|(_, e)| e)
        .collect()
}

/// Totals and per-counterparty breakdown from `focal`'s point of view.
pub fn aggregate(expenses: &[Expense], focal: &str) -> LedgerSummary {
    let focal_key = normalize_name(focal);

    let mut to_receive = Decimal::ZERO;
    let mut to_pay = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut total_share = Decimal::ZERO;
    let mut total_borrowed = Decimal::ZERO;
    let mut total_repaid = Decimal::ZERO;
    // key -> (display name, signed flow)
    let mut flows: BTreeMap<String, (String, Decimal)> = BTreeMap::new();

    for expense in dedupe_by_id(expenses) {
        let share = per_person_share(expense);
        if share.is_zero() {
            continue;
        }
        total_paid += paid_amount(expense, &focal_key);
        if is_in_split(expense, &focal_key) {
            total_share += share;
        }

        for debt in resolve_expense(expense) {
            let debtor_key = normalize_name(&debt.debtor);
            let creditor_key = normalize_name(&debt.creditor);
            if debtor_key == focal_key {
                total_borrowed += debt.allocated;
                if debt.settled {
                    total_repaid += debt.allocated;
                }
                if debt.outstanding > Decimal::ZERO {
                    to_pay += debt.outstanding;
                    flows
                        .entry(creditor_key)
                        .or_insert_with(|| (debt.creditor.clone(), Decimal::ZERO))
                        .1 -= debt.outstanding;
                }
            } else if creditor_key == focal_key && debt.outstanding > Decimal::ZERO {
                to_receive += debt.outstanding;
                flows
                    .entry(debtor_key)
                    .or_insert_with(|| (debt.debtor.clone(), Decimal::ZERO))
                    .1 += debt.outstanding;
            }
        }
    }

    let breakdown = flows
        .into_values()
        .filter_map(|(name, amount)| {
            let rounded = round_unit(amount);
            (rounded.abs() >= BREAKDOWN_MIN).then_some((name, rounded))
        })
        .collect();

    LedgerSummary {
        focal: focal.trim().to_string(),
        net_balance: to_receive - to_pay,
        to_receive,
        to_pay,
        total_paid,
        total_share,
        total_borrowed,
        total_repaid,
        breakdown,
    }
}

/// One summary per name, in the order given.
pub fn summarize_all(expenses: &[Expense], names: &[String]) -> Vec<LedgerSummary> {
    names.iter().map(|n| aggregate(expenses, n)).collect()
}

/// Badge state of `name` on a single expense.
pub fn expense_settlement_status(expense: &Expense, name: &str) -> SettlementStatus {
    let key = normalize_name(name);
    let payer_keys: HashSet<String> = expense.paid_by.keys().map(|p| normalize_name(p)).collect();
    if payer_keys.contains(&key) {
        return SettlementStatus::Owner;
    }
    if contains_name(&expense.settled_by, &key) {
        return SettlementStatus::Settled;
    }

    let share = per_person_share(expense);
    let repaid: Decimal = expense
        .payments
        .iter()
        .filter(|p| {
            p.amount > Decimal::ZERO
                && normalize_name(&p.from) == key
                && payer_keys.contains(&normalize_name(&p.to))
        })
        .map(|p| p.amount)
        .sum();
    if repaid >= share - STATUS_TOLERANCE {
        SettlementStatus::Settled
    } else {
        SettlementStatus::Pending
    }
}
