// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use splitclip::errors::StoreError;
use splitclip::models::{Expense, KIND_SETTLEMENT_REQUEST, Notification, Payment};
use splitclip::notify::{NotificationSink, WebhookSink, message_for, sink_from_settings};
use splitclip::{config, db, store};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::BTreeMap;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[derive(Default)]
struct RecordingSink {
    delivered: RefCell<Vec<Notification>>,
}

impl NotificationSink for RecordingSink {
    fn label(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, n: &Notification) {
        self.delivered.borrow_mut().push(n.clone());
    }
}

fn dinner(id: &str) -> Expense {
    let mut paid_by = BTreeMap::new();
    paid_by.insert("Alice".to_string(), Decimal::new(300, 0));
    Expense {
        id: id.into(),
        description: "Dinner".into(),
        total_amount: Decimal::new(300, 0),
        paid_by,
        split_among: vec!["Alice".into(), "Bob".into(), "Carol".into()],
        settled_by: Vec::new(),
        pending_settlements: Vec::new(),
        payments: Vec::new(),
        timestamp: 1_700_000_000_000,
    }
}

fn payment(from: &str, to: &str, amount: i64) -> Payment {
    Payment {
        from: from.into(),
        to: to.into(),
        amount: Decimal::new(amount, 0),
        timestamp: 1_700_000_100_000,
    }
}

#[test]
fn insert_and_load_preserve_fields() {
    let conn = base_conn();
    let mut e = dinner("e1");
    e.paid_by.insert("Bob".into(), Decimal::new(1050, 2));
    e.total_amount = Decimal::new(31050, 2);
    store::insert_expense(&conn, &e).unwrap();

    let loaded = store::get_expense(&conn, "e1").unwrap();
    assert_eq!(loaded, e);
}

#[test]
fn load_returns_newest_first() {
    let conn = base_conn();
    let mut older = dinner("old");
    older.timestamp = 1;
    let mut newer = dinner("new");
    newer.timestamp = 2;
    store::insert_expense(&conn, &older).unwrap();
    store::insert_expense(&conn, &newer).unwrap();

    let ids: Vec<String> = store::load_expenses(&conn)
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[test]
fn insert_rejects_duplicates_and_invalid_records() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    assert!(matches!(
        store::insert_expense(&conn, &dinner("e1")),
        Err(StoreError::DuplicateExpense { .. })
    ));

    let mut empty_split = dinner("e2");
    empty_split.split_among = vec!["  ".into()];
    assert!(matches!(
        store::insert_expense(&conn, &empty_split),
        Err(StoreError::InvalidExpense(_))
    ));

    let mut unpaid = dinner("e3");
    unpaid.paid_by.clear();
    assert!(matches!(
        store::insert_expense(&conn, &unpaid),
        Err(StoreError::InvalidExpense(_))
    ));
    assert_eq!(store::load_expenses(&conn).unwrap().len(), 1);
}

#[test]
fn next_expense_id_skips_taken_ids() {
    let conn = base_conn();
    let first = store::next_expense_id(&conn).unwrap();
    store::insert_expense(&conn, &dinner(&first)).unwrap();
    let second = store::next_expense_id(&conn).unwrap();
    assert_ne!(first, second);
    assert!(second.parse::<i64>().unwrap() > first.parse::<i64>().unwrap());
}

#[test]
fn delete_removes_expense_and_children() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    store::record_payment(&conn, "e1", &payment("Bob", "Alice", 100)).unwrap();
    store::delete_expense(&conn, "e1").unwrap();

    assert!(matches!(
        store::get_expense(&conn, "e1"),
        Err(StoreError::ExpenseNotFound { .. })
    ));
    let leftover: i64 = conn
        .query_row("SELECT COUNT(*) FROM payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(leftover, 0);
    assert!(store::delete_expense(&conn, "e1").is_err());
}

#[test]
fn mark_settled_clears_pending_and_is_idempotent() {
    let conn = base_conn();
    let mut e = dinner("e1");
    e.pending_settlements.push("Bob".into());
    store::insert_expense(&conn, &e).unwrap();

    store::mark_settled(&conn, "e1", " bob").unwrap();
    let e = store::mark_settled(&conn, "e1", "BOB").unwrap();
    assert_eq!(e.settled_by, vec!["bob"]);
    assert!(e.pending_settlements.is_empty());

    let e = store::mark_unsettled(&conn, "e1", "Bob").unwrap();
    assert!(e.settled_by.is_empty());
    assert!(store::get_expense(&conn, "e1").unwrap().settled_by.is_empty());
}

#[test]
fn toggle_flips_membership() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    assert!(store::toggle_settlement(&conn, "e1", "Carol").unwrap());
    assert!(!store::toggle_settlement(&conn, "e1", "carol").unwrap());
    assert!(store::get_expense(&conn, "e1").unwrap().settled_by.is_empty());
}

#[test]
fn settlement_on_missing_expense_fails() {
    let conn = base_conn();
    assert!(matches!(
        store::mark_settled(&conn, "nope", "Bob"),
        Err(StoreError::ExpenseNotFound { .. })
    ));
}

#[test]
fn record_payment_validates_input() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();

    for bad in [
        payment("Bob", "Alice", 0),
        payment("Bob", "Alice", -5),
        payment("Bob", " bob ", 10),
        payment("", "Alice", 10),
    ] {
        assert!(matches!(
            store::record_payment(&conn, "e1", &bad),
            Err(StoreError::InvalidPayment(_))
        ));
    }
    assert!(matches!(
        store::record_payment(&conn, "missing", &payment("Bob", "Alice", 10)),
        Err(StoreError::ExpenseNotFound { .. })
    ));

    store::record_payment(&conn, "e1", &payment("Bob", "Alice", 60)).unwrap();
    store::record_payment(&conn, "e1", &payment("Bob", "Alice", 40)).unwrap();
    let e = store::get_expense(&conn, "e1").unwrap();
    assert_eq!(e.payments.len(), 2);
    assert_eq!(
        e.payments.iter().map(|p| p.amount).sum::<Decimal>(),
        Decimal::new(100, 0)
    );
}

#[test]
fn request_settlement_notifies_once() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    let sink = RecordingSink::default();

    let n = store::request_settlement(
        &conn,
        &sink,
        "e1",
        "Bob",
        "Alice",
        Decimal::new(100, 0),
        Some("sent via bank"),
    )
    .unwrap()
    .unwrap();
    assert_eq!(n.kind, KIND_SETTLEMENT_REQUEST);
    assert_eq!(n.expense_description.as_deref(), Some("Dinner"));
    assert!(!n.read);

    let again = store::request_settlement(
        &conn,
        &sink,
        "e1",
        "bob",
        "Alice",
        Decimal::new(100, 0),
        None,
    )
    .unwrap();
    assert!(again.is_none());

    assert_eq!(sink.delivered.borrow().len(), 1);
    assert_eq!(sink.delivered.borrow()[0].id, n.id);
    assert_eq!(
        store::get_expense(&conn, "e1").unwrap().pending_settlements,
        vec!["Bob"]
    );
    assert_eq!(store::list_notifications(&conn, Some("alice"), false).unwrap().len(), 1);
    assert!(store::list_notifications(&conn, Some("Carol"), false).unwrap().is_empty());
}

#[test]
fn confirm_moves_requester_to_settled() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    let sink = RecordingSink::default();
    let n = store::request_settlement(&conn, &sink, "e1", "Bob", "Alice", Decimal::new(100, 0), None)
        .unwrap()
        .unwrap();

    store::confirm_settlement(&conn, n.id).unwrap();
    let e = store::get_expense(&conn, "e1").unwrap();
    assert_eq!(e.settled_by, vec!["Bob"]);
    assert!(e.pending_settlements.is_empty());
    assert!(store::list_notifications(&conn, None, false).unwrap().is_empty());
    assert!(matches!(
        store::confirm_settlement(&conn, n.id),
        Err(StoreError::NotificationNotFound { .. })
    ));
}

#[test]
fn reject_allows_asking_again() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    let sink = RecordingSink::default();
    let n = store::request_settlement(&conn, &sink, "e1", "Bob", "Alice", Decimal::new(100, 0), None)
        .unwrap()
        .unwrap();

    store::reject_settlement(&conn, n.id).unwrap();
    let e = store::get_expense(&conn, "e1").unwrap();
    assert!(e.settled_by.is_empty());
    assert!(e.pending_settlements.is_empty());

    let retry = store::request_settlement(&conn, &sink, "e1", "Bob", "Alice", Decimal::new(100, 0), None)
        .unwrap();
    assert!(retry.is_some());
    assert_eq!(sink.delivered.borrow().len(), 2);
}

#[test]
fn confirm_after_expense_removed_drops_request() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    let sink = RecordingSink::default();
    let n = store::request_settlement(&conn, &sink, "e1", "Bob", "Alice", Decimal::new(100, 0), None)
        .unwrap()
        .unwrap();
    store::delete_expense(&conn, "e1").unwrap();

    let confirmed = store::confirm_settlement(&conn, n.id).unwrap();
    assert_eq!(confirmed.from_user, "Bob");
    assert!(store::list_notifications(&conn, None, false).unwrap().is_empty());
}

#[test]
fn notifications_filter_unread() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    let sink = RecordingSink::default();
    let bob = store::request_settlement(&conn, &sink, "e1", "Bob", "Alice", Decimal::new(100, 0), None)
        .unwrap()
        .unwrap();
    store::request_settlement(&conn, &sink, "e1", "Carol", "Alice", Decimal::new(100, 0), None)
        .unwrap()
        .unwrap();

    store::mark_read(&conn, bob.id).unwrap();
    assert!(store::get_notification(&conn, bob.id).unwrap().read);
    let unread = store::list_notifications(&conn, Some("Alice"), true).unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].from_user, "Carol");
    assert!(matches!(
        store::mark_read(&conn, 9999),
        Err(StoreError::NotificationNotFound { id: 9999 })
    ));
}

#[test]
fn message_and_webhook_payload_describe_request() {
    let n = Notification {
        id: 7,
        kind: KIND_SETTLEMENT_REQUEST.into(),
        from_user: "Bob".into(),
        to_user: "Alice".into(),
        expense_id: Some("e1".into()),
        expense_description: Some("Dinner".into()),
        amount: Decimal::new(100, 0),
        note: Some("sent via bank".into()),
        timestamp: 1_700_000_000_000,
        read: false,
    };
    assert_eq!(
        message_for(&n),
        "Bob says they settled 100 for 'Dinner': sent via bank"
    );

    let payload = WebhookSink::payload(&n);
    assert_eq!(payload["topic"], "Alice");
    assert_eq!(payload["notification"]["title"], "Settlement request from Bob");
    assert_eq!(payload["data"]["expenseId"], "e1");
}

#[test]
fn friends_are_unique_by_normalized_name() {
    let conn = base_conn();
    let alice = store::add_friend(&conn, " Alice ", None, Some("555-0100")).unwrap();
    assert_eq!(alice.name, "Alice");
    assert!(matches!(
        store::add_friend(&conn, "alice", None, None),
        Err(StoreError::DuplicateFriend { .. })
    ));
    assert!(matches!(
        store::add_friend(&conn, "   ", None, None),
        Err(StoreError::InvalidFriend(_))
    ));
    store::add_friend(&conn, "bob", None, None).unwrap();

    let names: Vec<String> = store::list_friends(&conn)
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Alice", "bob"]);
    assert_eq!(
        store::find_friend(&conn, "ALICE").unwrap().unwrap().phone.as_deref(),
        Some("555-0100")
    );

    store::remove_friend(&conn, "BOB").unwrap();
    assert!(matches!(
        store::remove_friend(&conn, "bob"),
        Err(StoreError::FriendNotFound { .. })
    ));
}

#[test]
fn unreachable_webhook_does_not_fail_the_request() {
    let conn = base_conn();
    store::insert_expense(&conn, &dinner("e1")).unwrap();
    config::set_setting(&conn, config::NOTIFY_WEBHOOK, "http://127.0.0.1:1/hook").unwrap();

    let sink = sink_from_settings(&conn).unwrap();
    assert_eq!(sink.label(), "webhook");
    let n = store::request_settlement(
        &conn,
        sink.as_ref(),
        "e1",
        "Bob",
        "Alice",
        Decimal::new(100, 0),
        None,
    )
    .unwrap();
    assert!(n.is_some());

    assert_eq!(
        store::get_expense(&conn, "e1").unwrap().pending_settlements,
        vec!["Bob"]
    );
    let inbox = store::list_notifications(&conn, Some("Alice"), false).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from_user, "Bob");
}

#[test]
fn sink_is_log_only_without_a_webhook() {
    let conn = base_conn();
    assert_eq!(sink_from_settings(&conn).unwrap().label(), "log");

    config::set_setting(&conn, config::NOTIFY_WEBHOOK, "   ").unwrap();
    assert_eq!(sink_from_settings(&conn).unwrap().label(), "log");

    config::set_setting(&conn, config::NOTIFY_WEBHOOK, "http://127.0.0.1:1/hook").unwrap();
    assert_eq!(sink_from_settings(&conn).unwrap().label(), "webhook");
    config::unset_setting(&conn, config::NOTIFY_WEBHOOK).unwrap();
    assert_eq!(sink_from_settings(&conn).unwrap().label(), "log");
}
