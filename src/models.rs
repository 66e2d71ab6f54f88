// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A shared expense as held by the expense store.
///
/// Only `settled_by`, `pending_settlements` and `payments` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub total_amount: Decimal,
    pub paid_by: BTreeMap<String, Decimal>,
    pub split_among: Vec<String>,
    #[serde(default)]
    pub settled_by: Vec<String>,
    #[serde(default)]
    pub pending_settlements: Vec<String>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub timestamp: i64, // ms since epoch
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub kind: String,
    pub from_user: String,
    pub to_user: String,
    pub expense_id: Option<String>,
    pub expense_description: Option<String>,
    pub amount: Decimal,
    pub note: Option<String>,
    pub timestamp: i64,
    pub read: bool,
}

pub const KIND_SETTLEMENT_REQUEST: &str = "settlement_request";

/// Settlement state of one participant on one expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Settled,
    Pending,
    Owner,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Settled => "SETTLED",
            SettlementStatus::Pending => "PENDING",
            SettlementStatus::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed balance of one participant on one expense.
/// Positive is a net creditor, negative a net debtor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub name: String,
    pub amount: Decimal,
}

/// One debtor -> creditor allocation for a single expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Debt {
    pub debtor: String,
    pub creditor: String,
    /// Proportional share of the debtor's deficit, before any repayment.
    pub allocated: Decimal,
    /// Sum of recorded payments on exactly this pair.
    pub paid: Decimal,
    /// What is still owed; zero when settled.
    pub outstanding: Decimal,
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub focal: String,
    pub net_balance: Decimal,
    pub to_receive: Decimal,
    pub to_pay: Decimal,
    pub total_paid: Decimal,
    pub total_share: Decimal,
    pub total_borrowed: Decimal,
    pub total_repaid: Decimal,
    /// Counterparty -> rounded amount; positive means they owe the focal person.
    pub breakdown: BTreeMap<String, Decimal>,
}
