// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use splitclip::models::{Expense, Payment};
use splitclip::{cli, commands::exporter, db, store};
use rusqlite::Connection;
use serde_json::json;
use std::collections::BTreeMap;
use tempfile::tempdir;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn seed(conn: &Connection) {
    let mut paid_by = BTreeMap::new();
    paid_by.insert("Alice".to_string(), Decimal::new(300, 0));
    let dinner = Expense {
        id: "100".into(),
        description: "Dinner".into(),
        total_amount: Decimal::new(300, 0),
        paid_by,
        split_among: vec!["Alice".into(), "Bob".into(), "Carol".into()],
        settled_by: vec!["Carol".into()],
        pending_settlements: Vec::new(),
        payments: vec![Payment {
            from: "Bob".into(),
            to: "Alice".into(),
            amount: Decimal::new(4050, 2),
            timestamp: 1_700_000_500_000,
        }],
        timestamp: 1_700_000_000_000,
    };
    store::insert_expense(conn, &dinner).unwrap();

    let mut paid_by = BTreeMap::new();
    paid_by.insert("Bob".to_string(), Decimal::new(20, 0));
    let taxi = Expense {
        id: "200".into(),
        description: "Taxi".into(),
        total_amount: Decimal::new(20, 0),
        paid_by,
        split_among: vec!["Alice".into(), "Bob".into()],
        settled_by: Vec::new(),
        pending_settlements: vec!["Alice".into()],
        payments: Vec::new(),
        timestamp: 1_700_001_000_000,
    };
    store::insert_expense(conn, &taxi).unwrap();
}

fn run_export(conn: &Connection, format: &str, out: &str) -> anyhow::Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "splitclip",
        "export",
        "expenses",
        "--format",
        format,
        "--out",
        out,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(conn, export_m)
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn export_expenses_writes_pretty_json_oldest_first() {
    let conn = base_conn();
    seed(&conn);

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();
    run_export(&conn, "json", &out_str).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.contains("\n  "), "expected pretty-printed output");
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        parsed,
        json!([
            {
                "id": "100",
                "description": "Dinner",
                "totalAmount": "300",
                "paidBy": { "Alice": "300" },
                "splitAmong": ["Alice", "Bob", "Carol"],
                "settledBy": ["Carol"],
                "pendingSettlements": [],
                "payments": [
                    { "from": "Bob", "to": "Alice", "amount": "40.50", "timestamp": 1_700_000_500_000i64 }
                ],
                "timestamp": 1_700_000_000_000i64
            },
            {
                "id": "200",
                "description": "Taxi",
                "totalAmount": "20",
                "paidBy": { "Bob": "20" },
                "splitAmong": ["Alice", "Bob"],
                "settledBy": [],
                "pendingSettlements": ["Alice"],
                "payments": [],
                "timestamp": 1_700_001_000_000i64
            }
        ])
    );
}

#[test]
fn export_expenses_csv_flattens_lists() {
    let conn = base_conn();
    seed(&conn);

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();
    run_export(&conn, " CSV ", &out_str).unwrap();

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "id",
            "timestamp",
            "description",
            "total_amount",
            "paid_by",
            "split_among",
            "settled_by",
            "pending_settlements",
            "payments"
        ]
    );
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "100");
    assert_eq!(&rows[0][4], "Alice=300");
    assert_eq!(&rows[0][5], "Alice;Bob;Carol");
    assert_eq!(&rows[0][6], "Carol");
    assert_eq!(&rows[0][8], "Bob>Alice=40.50");
    assert_eq!(&rows[1][7], "Alice");
}

#[test]
fn exported_json_imports_into_a_fresh_database() {
    let conn = base_conn();
    seed(&conn);

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("snapshot.json");
    let out_str = out_path.to_string_lossy().to_string();
    run_export(&conn, "json", &out_str).unwrap();

    let fresh = base_conn();
    let (added, skipped) =
        splitclip::commands::importer::import_expenses(&fresh, &out_str).unwrap();
    assert_eq!((added, skipped), (2, 0));
    assert_eq!(
        store::load_expenses(&fresh).unwrap(),
        store::load_expenses(&conn).unwrap()
    );
}

#[test]
fn export_expenses_rejects_unknown_format() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    let out_str = out_path.to_string_lossy().to_string();

    assert!(run_export(&conn, "xml", &out_str).is_err());
    assert!(!out_path.exists());
}
