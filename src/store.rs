// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! SQLite-backed expense store.
//!
//! The ledger never writes; every change to settlement state goes through here.
//! Settlement mutations load the expense, change it in memory and write the
//! affected name lists back inside one transaction.

use crate::errors::{StoreError, StoreResult};
use crate::ledger::{contains_name, normalize_name, split_count};
use crate::models::{Expense, Friend, KIND_SETTLEMENT_REQUEST, Notification, Payment};
use crate::notify::NotificationSink;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

const SETTLED_TABLE: &str = "expense_settled";
const PENDING_TABLE: &str = "expense_pending";

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_amount(s: &str, what: &str) -> StoreResult<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| StoreError::Corrupt(format!("invalid {} amount '{}'", what, s)))
}

fn expense_exists(conn: &Connection, id: &str) -> StoreResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM expenses WHERE id=?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Millisecond timestamp, bumped until unused.
pub fn next_expense_id(conn: &Connection) -> StoreResult<String> {
    let mut ts = now_millis();
    while expense_exists(conn, &ts.to_string())? {
        ts += 1;
    }
    Ok(ts.to_string())
}

pub fn validate_expense(expense: &Expense) -> StoreResult<()> {
    if expense.id.trim().is_empty() {
        return Err(StoreError::InvalidExpense("id is empty".into()));
    }
    if expense.description.trim().is_empty() {
        return Err(StoreError::InvalidExpense("description is empty".into()));
    }
    if split_count(expense) == 0 {
        return Err(StoreError::InvalidExpense("nobody to split among".into()));
    }
    if expense.paid_by.values().any(|a| *a < Decimal::ZERO) {
        return Err(StoreError::InvalidExpense("negative payer amount".into()));
    }
    if !expense.paid_by.values().any(|a| *a > Decimal::ZERO) {
        return Err(StoreError::InvalidExpense("nobody paid anything".into()));
    }
    Ok(())
}

fn write_names(conn: &Connection, table: &str, expense_id: &str, names: &[String]) -> StoreResult<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE expense_id=?1", table),
        params![expense_id],
    )?;
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {}(expense_id, position, name) VALUES (?1, ?2, ?3)",
        table
    ))?;
    for (i, name) in names.iter().enumerate() {
        stmt.execute(params![expense_id, i as i64, name])?;
    }
    Ok(())
}

fn write_payment(conn: &Connection, expense_id: &str, p: &Payment) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO payments(expense_id, from_name, to_name, amount, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![expense_id, p.from, p.to, p.amount.to_string(), p.timestamp],
    )?;
    Ok(())
}

fn write_expense(conn: &Connection, e: &Expense) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO expenses(id, description, total_amount, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![e.id, e.description, e.total_amount.to_string(), e.timestamp],
    )?;
    {
        let mut stmt = conn
            .prepare("INSERT OR REPLACE INTO expense_payers(expense_id, name, amount) VALUES (?1, ?2, ?3)")?;
        for (name, amount) in &e.paid_by {
            stmt.execute(params![e.id, name, amount.to_string()])?;
        }
    }
    write_names(conn, "expense_splits", &e.id, &e.split_among)?;
    write_names(conn, SETTLED_TABLE, &e.id, &e.settled_by)?;
    write_names(conn, PENDING_TABLE, &e.id, &e.pending_settlements)?;
    for p in &e.payments {
        write_payment(conn, &e.id, p)?;
    }
    Ok(())
}

/// Validate and persist a new expense.
pub fn insert_expense(conn: &Connection, expense: &Expense) -> StoreResult<()> {
    validate_expense(expense)?;
    if expense_exists(conn, &expense.id)? {
        return Err(StoreError::DuplicateExpense {
            id: expense.id.clone(),
        });
    }
    let tx = conn.unchecked_transaction()?;
    write_expense(&tx, expense)?;
    tx.commit()?;
    info!(id = %expense.id, total = %expense.total_amount, "expense added");
    Ok(())
}

/// Store records from another source as-is, all or nothing.
///
/// No validation: snapshots may carry malformed records and the ledger copes.
/// Ids already present are skipped. Returns `(added, skipped)`.
pub fn import_expenses(conn: &Connection, expenses: &[Expense]) -> StoreResult<(usize, usize)> {
    let tx = conn.unchecked_transaction()?;
    let mut added = 0;
    let mut skipped = 0;
    for e in expenses {
        if expense_exists(&tx, &e.id)? {
            debug!(id = %e.id, "import skipped existing expense");
            skipped += 1;
            continue;
        }
        write_expense(&tx, e)?;
        added += 1;
    }
    tx.commit()?;
    Ok((added, skipped))
}

fn split_list(e: &mut Expense) -> &mut Vec<String> {
    &mut e.split_among
}

fn settled_list(e: &mut Expense) -> &mut Vec<String> {
    &mut e.settled_by
}

fn pending_list(e: &mut Expense) -> &mut Vec<String> {
    &mut e.pending_settlements
}

fn load_names(
    conn: &Connection,
    table: &str,
    id: Option<&str>,
    index: &HashMap<String, usize>,
    out: &mut [Expense],
    pick: fn(&mut Expense) -> &mut Vec<String>,
) -> StoreResult<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT expense_id, name FROM {} WHERE (?1 IS NULL OR expense_id=?1) ORDER BY expense_id, position",
        table
    ))?;
    let mut rows = stmt.query(params![id])?;
    while let Some(r) = rows.next()? {
        let eid: String = r.get(0)?;
        let name: String = r.get(1)?;
        if let Some(&i) = index.get(&eid) {
            pick(&mut out[i]).push(name);
        }
    }
    Ok(())
}

fn load(conn: &Connection, id: Option<&str>) -> StoreResult<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, total_amount, timestamp FROM expenses
         WHERE (?1 IS NULL OR id=?1) ORDER BY timestamp DESC, id DESC",
    )?;
    let mut rows = stmt.query(params![id])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let eid: String = r.get(0)?;
        let total: String = r.get(2)?;
        out.push(Expense {
            total_amount: parse_amount(&total, &format!("total of {}", eid))?,
            id: eid,
            description: r.get(1)?,
            paid_by: Default::default(),
            split_among: Vec::new(),
            settled_by: Vec::new(),
            pending_settlements: Vec::new(),
            payments: Vec::new(),
            timestamp: r.get(3)?,
        });
    }
    let index: HashMap<String, usize> = out
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();

    {
        let mut stmt = conn.prepare(
            "SELECT expense_id, name, amount FROM expense_payers WHERE (?1 IS NULL OR expense_id=?1)",
        )?;
        let mut rows = stmt.query(params![id])?;
        while let Some(r) = rows.next()? {
            let eid: String = r.get(0)?;
            let name: String = r.get(1)?;
            let amount: String = r.get(2)?;
            if let Some(&i) = index.get(&eid) {
                let amount = parse_amount(&amount, &format!("payer {} of {}", name, eid))?;
                out[i].paid_by.insert(name, amount);
            }
        }
    }
    load_names(conn, "expense_splits", id, &index, &mut out, split_list)?;
    load_names(conn, SETTLED_TABLE, id, &index, &mut out, settled_list)?;
    load_names(conn, PENDING_TABLE, id, &index, &mut out, pending_list)?;

    let mut stmt = conn.prepare(
        "SELECT expense_id, from_name, to_name, amount, timestamp FROM payments
         WHERE (?1 IS NULL OR expense_id=?1) ORDER BY timestamp, id",
    )?;
    let mut rows = stmt.query(params![id])?;
    while let Some(r) = rows.next()? {
        let eid: String = r.get(0)?;
        let amount: String = r.get(3)?;
        if let Some(&i) = index.get(&eid) {
            out[i].payments.push(Payment {
                from: r.get(1)?,
                to: r.get(2)?,
                amount: parse_amount(&amount, &format!("payment on {}", eid))?,
                timestamp: r.get(4)?,
            });
        }
    }
    Ok(out)
}

/// Current snapshot of every expense, newest first.
pub fn load_expenses(conn: &Connection) -> StoreResult<Vec<Expense>> {
    load(conn, None)
}

pub fn get_expense(conn: &Connection, id: &str) -> StoreResult<Expense> {
    load(conn, Some(id))?
        .pop()
        .ok_or_else(|| StoreError::ExpenseNotFound { id: id.to_string() })
}

pub fn delete_expense(conn: &Connection, id: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    for table in [
        "expense_payers",
        "expense_splits",
        SETTLED_TABLE,
        PENDING_TABLE,
        "payments",
    ] {
        tx.execute(
            &format!("DELETE FROM {} WHERE expense_id=?1", table),
            params![id],
        )?;
    }
    let n = tx.execute("DELETE FROM expenses WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(StoreError::ExpenseNotFound { id: id.to_string() });
    }
    tx.commit()?;
    info!(id, "expense removed");
    Ok(())
}

fn save_settlement_state(conn: &Connection, e: &Expense) -> StoreResult<()> {
    write_names(conn, SETTLED_TABLE, &e.id, &e.settled_by)?;
    write_names(conn, PENDING_TABLE, &e.id, &e.pending_settlements)?;
    Ok(())
}

fn apply_settled(e: &mut Expense, name: &str) {
    let key = normalize_name(name);
    if !contains_name(&e.settled_by, &key) {
        e.settled_by.push(name.trim().to_string());
    }
    e.pending_settlements.retain(|n| normalize_name(n) != key);
}

fn apply_unsettled(e: &mut Expense, name: &str) {
    let key = normalize_name(name);
    e.settled_by.retain(|n| normalize_name(n) != key);
}

fn with_expense<F>(conn: &Connection, id: &str, f: F) -> StoreResult<Expense>
where
    F: FnOnce(&mut Expense),
{
    let tx = conn.unchecked_transaction()?;
    let mut e = get_expense(&tx, id)?;
    f(&mut e);
    save_settlement_state(&tx, &e)?;
    tx.commit()?;
    Ok(e)
}

/// Confirm `name` has settled; also resolves any pending request of theirs.
pub fn mark_settled(conn: &Connection, id: &str, name: &str) -> StoreResult<Expense> {
    let e = with_expense(conn, id, |e| apply_settled(e, name))?;
    info!(expense = id, name = name.trim(), "marked settled");
    Ok(e)
}

pub fn mark_unsettled(conn: &Connection, id: &str, name: &str) -> StoreResult<Expense> {
    let e = with_expense(conn, id, |e| apply_unsettled(e, name))?;
    info!(expense = id, name = name.trim(), "marked unsettled");
    Ok(e)
}

/// Flip settled membership. Returns the new state.
pub fn toggle_settlement(conn: &Connection, id: &str, name: &str) -> StoreResult<bool> {
    let e = with_expense(conn, id, |e| {
        if contains_name(&e.settled_by, name) {
            apply_unsettled(e, name)
        } else {
            apply_settled(e, name)
        }
    })?;
    Ok(contains_name(&e.settled_by, name))
}

pub fn record_payment(conn: &Connection, id: &str, payment: &Payment) -> StoreResult<()> {
    if payment.amount <= Decimal::ZERO {
        return Err(StoreError::InvalidPayment(format!(
            "amount must be positive, got {}",
            payment.amount
        )));
    }
    let (from, to) = (normalize_name(&payment.from), normalize_name(&payment.to));
    if from.is_empty() || to.is_empty() {
        return Err(StoreError::InvalidPayment("from and to are required".into()));
    }
    if from == to {
        return Err(StoreError::InvalidPayment(
            "cannot pay yourself".into(),
        ));
    }
    if !expense_exists(conn, id)? {
        return Err(StoreError::ExpenseNotFound { id: id.to_string() });
    }
    write_payment(conn, id, payment)?;
    info!(
        expense = id,
        from = payment.from.as_str(),
        to = payment.to.as_str(),
        amount = %payment.amount,
        "payment recorded"
    );
    Ok(())
}

fn insert_notification(conn: &Connection, n: &Notification) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO notifications(kind, from_user, to_user, expense_id, expense_description, amount, note, timestamp, read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            n.kind,
            n.from_user,
            n.to_user,
            n.expense_id,
            n.expense_description,
            n.amount.to_string(),
            n.note,
            n.timestamp,
            n.read
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Put `from` on the pending list and tell `to`.
///
/// Returns `None` without notifying when a request is already pending.
pub fn request_settlement(
    conn: &Connection,
    sink: &dyn NotificationSink,
    id: &str,
    from: &str,
    to: &str,
    amount: Decimal,
    note: Option<&str>,
) -> StoreResult<Option<Notification>> {
    if amount < Decimal::ZERO {
        return Err(StoreError::InvalidPayment(format!(
            "amount must not be negative, got {}",
            amount
        )));
    }
    let tx = conn.unchecked_transaction()?;
    let mut e = get_expense(&tx, id)?;
    if contains_name(&e.pending_settlements, from) {
        debug!(expense = id, from, "settlement already requested");
        return Ok(None);
    }
    e.pending_settlements.push(from.trim().to_string());
    save_settlement_state(&tx, &e)?;

    let mut n = Notification {
        id: 0,
        kind: KIND_SETTLEMENT_REQUEST.to_string(),
        from_user: from.trim().to_string(),
        to_user: to.trim().to_string(),
        expense_id: Some(e.id.clone()),
        expense_description: Some(e.description.clone()),
        amount,
        note: note.map(str::to_string).filter(|s| !s.trim().is_empty()),
        timestamp: now_millis(),
        read: false,
    };
    n.id = insert_notification(&tx, &n)?;
    tx.commit()?;
    info!(
        expense = id,
        from = n.from_user.as_str(),
        to = n.to_user.as_str(),
        sink = sink.label(),
        "settlement requested"
    );

    sink.deliver(&n);
    Ok(Some(n))
}

fn notification_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<(Notification, String)> {
    let amount: String = r.get(6)?;
    Ok((
        Notification {
            id: r.get(0)?,
            kind: r.get(1)?,
            from_user: r.get(2)?,
            to_user: r.get(3)?,
            expense_id: r.get(4)?,
            expense_description: r.get(5)?,
            amount: Decimal::ZERO,
            note: r.get(7)?,
            timestamp: r.get(8)?,
            read: r.get(9)?,
        },
        amount,
    ))
}

const NOTIFICATION_COLUMNS: &str =
    "id, kind, from_user, to_user, expense_id, expense_description, amount, note, timestamp, read";

pub fn get_notification(conn: &Connection, id: i64) -> StoreResult<Notification> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM notifications WHERE id=?1", NOTIFICATION_COLUMNS),
            params![id],
            notification_from_row,
        )
        .optional()?;
    let (mut n, amount) = row.ok_or(StoreError::NotificationNotFound { id })?;
    n.amount = parse_amount(&amount, "notification")?;
    Ok(n)
}

/// Newest first. `to_user` filters by normalized recipient name.
pub fn list_notifications(
    conn: &Connection,
    to_user: Option<&str>,
    unread_only: bool,
) -> StoreResult<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM notifications ORDER BY timestamp DESC, id DESC",
        NOTIFICATION_COLUMNS
    ))?;
    let rows = stmt.query_map([], notification_from_row)?;
    let key = to_user.map(normalize_name);
    let mut out = Vec::new();
    for row in rows {
        let (mut n, amount) = row?;
        if key.as_ref().is_some_and(|k| normalize_name(&n.to_user) != *k) {
            continue;
        }
        if unread_only && n.read {
            continue;
        }
        n.amount = parse_amount(&amount, "notification")?;
        out.push(n);
    }
    Ok(out)
}

pub fn mark_read(conn: &Connection, id: i64) -> StoreResult<()> {
    let n = conn.execute("UPDATE notifications SET read=1 WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotificationNotFound { id });
    }
    Ok(())
}

fn resolve_request<F>(conn: &Connection, notification_id: i64, f: F) -> StoreResult<Notification>
where
    F: FnOnce(&mut Expense, &str),
{
    let tx = conn.unchecked_transaction()?;
    let n = get_notification(&tx, notification_id)?;
    if let Some(eid) = n.expense_id.as_deref() {
        match get_expense(&tx, eid) {
            Ok(mut e) => {
                f(&mut e, &n.from_user);
                save_settlement_state(&tx, &e)?;
            }
            // expense gone; the request is simply dropped
            Err(StoreError::ExpenseNotFound { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    tx.execute("DELETE FROM notifications WHERE id=?1", params![notification_id])?;
    tx.commit()?;
    Ok(n)
}

/// Accept a settlement request: requester moves from pending to settled.
pub fn confirm_settlement(conn: &Connection, notification_id: i64) -> StoreResult<Notification> {
    let n = resolve_request(conn, notification_id, apply_settled)?;
    info!(notification = notification_id, from = n.from_user.as_str(), "settlement confirmed");
    Ok(n)
}

/// Decline a settlement request so it can be asked again.
pub fn reject_settlement(conn: &Connection, notification_id: i64) -> StoreResult<Notification> {
    let n = resolve_request(conn, notification_id, |e, from| {
        let key = normalize_name(from);
        e.pending_settlements.retain(|p| normalize_name(p) != key);
    })?;
    info!(notification = notification_id, from = n.from_user.as_str(), "settlement rejected");
    Ok(n)
}

pub fn add_friend(
    conn: &Connection,
    name: &str,
    image: Option<&str>,
    phone: Option<&str>,
) -> StoreResult<Friend> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidFriend("name is empty".into()));
    }
    if find_friend(conn, name)?.is_some() {
        return Err(StoreError::DuplicateFriend {
            name: name.to_string(),
        });
    }
    conn.execute(
        "INSERT INTO friends(name, image, phone) VALUES (?1, ?2, ?3)",
        params![name, image, phone],
    )?;
    let id = conn.last_insert_rowid();
    info!(id, name, "friend added");
    Ok(Friend {
        id,
        name: name.to_string(),
        image: image.map(str::to_string),
        phone: phone.map(str::to_string),
    })
}

pub fn list_friends(conn: &Connection) -> StoreResult<Vec<Friend>> {
    let mut stmt =
        conn.prepare("SELECT id, name, image, phone FROM friends ORDER BY name COLLATE NOCASE")?;
    let rows = stmt.query_map([], |r| {
        Ok(Friend {
            id: r.get(0)?,
            name: r.get(1)?,
            image: r.get(2)?,
            phone: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for f in rows {
        out.push(f?);
    }
    Ok(out)
}

/// Lookup by normalized name.
pub fn find_friend(conn: &Connection, name: &str) -> StoreResult<Option<Friend>> {
    let key = normalize_name(name);
    Ok(list_friends(conn)?
        .into_iter()
        .find(|f| normalize_name(&f.name) == key))
}

pub fn remove_friend(conn: &Connection, name: &str) -> StoreResult<()> {
    let friend = find_friend(conn, name)?.ok_or_else(|| StoreError::FriendNotFound {
        name: name.trim().to_string(),
    })?;
    conn.execute("DELETE FROM friends WHERE id=?1", params![friend.id])?;
    info!(id = friend.id, name = friend.name.as_str(), "friend removed");
    Ok(())
}
