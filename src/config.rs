// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

pub const IDENTITY: &str = "identity";
pub const NOTIFY_WEBHOOK: &str = "notify_webhook";
pub const CURRENCY: &str = "currency";

pub const KNOWN_KEYS: [&str; 3] = [IDENTITY, NOTIFY_WEBHOOK, CURRENCY];

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(anyhow!(
            "Unknown setting '{}' (known: {})",
            key,
            KNOWN_KEYS.join(", ")
        ));
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn unset_setting(conn: &Connection, key: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM settings WHERE key=?1", params![key])? > 0)
}

pub fn all_settings(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn identity(conn: &Connection) -> Result<Option<String>> {
    Ok(get_setting(conn, IDENTITY)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// `--as` wins over the configured identity.
pub fn resolve_focal(conn: &Connection, as_name: Option<&str>) -> Result<String> {
    if let Some(name) = as_name.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(name.to_string());
    }
    identity(conn)?.ok_or_else(|| {
        anyhow!("No identity configured; run `splitclip whoami --set NAME` or pass --as NAME")
    })
}

pub fn currency(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, CURRENCY)?.unwrap_or_else(|| "USD".to_string()))
}
