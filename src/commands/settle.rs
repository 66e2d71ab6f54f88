// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::ledger::{is_payer, normalize_name, per_person_share, round_unit};
use crate::models::Payment;
use crate::notify;
use crate::store;
use crate::utils::{fmt_money, parse_decimal};
use anyhow::{Result, bail};
use rusqlite::Connection;
use tracing::warn;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("mark", sub)) => {
            let (id, name) = expense_and_name(sub);
            store::mark_settled(conn, id, name)?;
            println!("{} marked as settled on {}", name, id);
        }
        Some(("unmark", sub)) => {
            let (id, name) = expense_and_name(sub);
            store::mark_unsettled(conn, id, name)?;
            println!("{} marked as unsettled on {}", name, id);
        }
        Some(("pay", sub)) => pay(conn, sub)?,
        Some(("request", sub)) => request(conn, sub)?,
        Some(("confirm", sub)) => {
            let nid = *sub.get_one::<i64>("notification").unwrap();
            let n = store::confirm_settlement(conn, nid)?;
            println!("Confirmed: {} has settled", n.from_user);
        }
        Some(("reject", sub)) => {
            let nid = *sub.get_one::<i64>("notification").unwrap();
            let n = store::reject_settlement(conn, nid)?;
            println!("Rejected settlement request from {}", n.from_user);
        }
        _ => {}
    }
    Ok(())
}

fn expense_and_name(sub: &clap::ArgMatches) -> (&str, &str) {
    (
        sub.get_one::<String>("expense").unwrap().trim(),
        sub.get_one::<String>("name").unwrap().trim(),
    )
}

fn pay(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = sub.get_one::<String>("expense").unwrap().trim();
    let payment = Payment {
        from: sub.get_one::<String>("from").unwrap().trim().to_string(),
        to: sub.get_one::<String>("to").unwrap().trim().to_string(),
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        timestamp: store::now_millis(),
    };
    let expense = store::get_expense(conn, id)?;
    if !is_payer(&expense, &payment.to) {
        warn!(expense = id, to = payment.to.as_str(), "payment to someone who did not pay");
    }
    store::record_payment(conn, id, &payment)?;
    println!(
        "Recorded {} from {} to {}",
        fmt_money(&payment.amount, &config::currency(conn)?),
        payment.from,
        payment.to
    );
    Ok(())
}

fn request(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = sub.get_one::<String>("expense").unwrap().trim();
    let to = sub.get_one::<String>("to").unwrap().trim();
    let me = config::resolve_focal(conn, sub.get_one::<String>("as").map(|s| s.as_str()))?;
    let expense = store::get_expense(conn, id)?;
    if !is_payer(&expense, to) {
        bail!("{} did not pay for {}", to, id);
    }
    if normalize_name(&me) == normalize_name(to) {
        bail!("Cannot request settlement from yourself");
    }
    if is_payer(&expense, &me) {
        bail!("{} paid for {} and has nothing to settle", me, id);
    }
    let amount = match sub.get_one::<String>("amount") {
        Some(a) => parse_decimal(a)?,
        None => round_unit(per_person_share(&expense)),
    };
    let note = sub.get_one::<String>("note").map(|s| s.as_str());

    let sink = notify::sink_from_settings(conn)?;
    match store::request_settlement(conn, sink.as_ref(), id, &me, to, amount, note)? {
        Some(n) => println!("Request {} sent to {}", n.id, n.to_user),
        None => println!("A request for {} on {} is already pending", me, id),
    }
    Ok(())
}
