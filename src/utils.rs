// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

const UA: &str = concat!(
    "splitclip/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/splitclip)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// `NAME=AMOUNT`, as given to `expense add --paid`.
pub fn parse_payer(s: &str) -> Result<(String, Decimal)> {
    let (name, amount) = s
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Invalid payer '{}', expected NAME=AMOUNT", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Invalid payer '{}': name is empty", s));
    }
    let amount = parse_decimal(amount)?;
    if amount <= Decimal::ZERO {
        return Err(anyhow!("Invalid payer '{}': amount must be positive", s));
    }
    Ok((name.to_string(), amount))
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

/// Signed whole units, as shown on balance lines.
pub fn fmt_signed(d: &Decimal) -> String {
    let r = crate::ledger::round_unit(*d);
    if r.is_sign_negative() && !r.is_zero() {
        format!("-{}", r.abs())
    } else {
        format!("+{}", r.abs())
    }
}

pub fn fmt_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
