// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle_config(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = sub.get_one::<String>("value").unwrap().trim();
            config::set_setting(conn, key, value)?;
            println!("{} = {}", key, value);
        }
        Some(("unset", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            if config::unset_setting(conn, key)? {
                println!("Removed {}", key);
            } else {
                println!("{} was not set", key);
            }
        }
        _ => {
            let rows = config::all_settings(conn)?
                .into_iter()
                .map(|(k, v)| vec![k, v])
                .collect();
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
    }
    Ok(())
}

pub fn handle_whoami(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    if let Some(name) = m.get_one::<String>("set") {
        config::set_setting(conn, config::IDENTITY, name.trim())?;
    }
    match config::identity(conn)? {
        Some(me) => {
            let member = store::find_friend(conn, &me)?.is_some();
            println!(
                "{} ({})",
                me,
                if member { "member" } else { "not in friend list" }
            );
        }
        None => println!("No identity set; use `splitclip whoami --set NAME`"),
    }
    Ok(())
}
