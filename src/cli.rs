// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn as_arg() -> Arg {
    Arg::new("as")
        .long("as")
        .value_name("NAME")
        .help("Act as NAME instead of the configured identity")
}

fn req(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

pub fn build_cli() -> Command {
    Command::new("splitclip")
        .version(crate_version!())
        .about("Split shared expenses with friends and settle up")
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("config")
                .about("Runtime settings (identity, notify_webhook, currency)")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(req("key", "Setting name"))
                        .arg(req("value", "Setting value")),
                )
                .subcommand(Command::new("unset").arg(req("key", "Setting name"))),
        )
        .subcommand(
            Command::new("whoami")
                .about("Show or set who you are")
                .arg(opt("set", "Display name to act as")),
        )
        .subcommand(
            Command::new("friend")
                .about("Friend directory")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Display name"))
                        .arg(opt("phone", "Phone number"))
                        .arg(opt("image", "Avatar reference")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("rm").arg(req("name", "Display name")))
                .subcommand(json_args(
                    Command::new("show")
                        .about("Balances and expenses from a friend's point of view")
                        .arg(req("name", "Display name")),
                )),
        )
        .subcommand(
            Command::new("expense")
                .about("Shared expenses")
                .subcommand(
                    Command::new("add")
                        .arg(req("description", "What it was for"))
                        .arg(
                            Arg::new("paid")
                                .long("paid")
                                .required(true)
                                .action(ArgAction::Append)
                                .value_name("NAME=AMOUNT")
                                .help("Who paid and how much; repeat for several payers"),
                        )
                        .arg(
                            Arg::new("split")
                                .long("split")
                                .action(ArgAction::Append)
                                .value_name("NAME")
                                .help("Who shares the cost; defaults to every friend"),
                        )
                        .arg(opt("id", "Explicit expense id")),
                )
                .subcommand(json_args(
                    Command::new("list")
                        .arg(opt("involving", "Only expenses NAME paid for or shares"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(json_args(Command::new("show").arg(req("id", "Expense id"))))
                .subcommand(Command::new("rm").arg(req("id", "Expense id"))),
        )
        .subcommand(
            Command::new("settle")
                .about("Settlement actions on a single expense")
                .subcommand(
                    Command::new("mark")
                        .about("Confirm NAME has settled their share")
                        .arg(req("expense", "Expense id"))
                        .arg(req("name", "Participant")),
                )
                .subcommand(
                    Command::new("unmark")
                        .about("Undo a settlement confirmation")
                        .arg(req("expense", "Expense id"))
                        .arg(req("name", "Participant")),
                )
                .subcommand(
                    Command::new("pay")
                        .about("Record a repayment between two participants")
                        .arg(req("expense", "Expense id"))
                        .arg(req("from", "Who paid back"))
                        .arg(req("to", "Who received it"))
                        .arg(req("amount", "Amount")),
                )
                .subcommand(
                    Command::new("request")
                        .about("Ask a payer to confirm you have settled")
                        .arg(req("expense", "Expense id"))
                        .arg(req("to", "Payer to notify"))
                        .arg(opt("amount", "Amount repaid; defaults to your share"))
                        .arg(opt("note", "Message for the payer"))
                        .arg(as_arg()),
                )
                .subcommand(
                    Command::new("confirm").arg(
                        Arg::new("notification")
                            .long("notification")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    Command::new("reject").arg(
                        Arg::new("notification")
                            .long("notification")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(json_args(
            Command::new("balance")
                .about("What you are owed and what you owe")
                .arg(as_arg()),
        ))
        .subcommand(json_args(
            Command::new("summary").about("Net balance of every friend"),
        ))
        .subcommand(Command::new("doctor").about("Report malformed expense records"))
        .subcommand(
            Command::new("notify")
                .about("Settlement request inbox")
                .subcommand(json_args(
                    Command::new("list").arg(as_arg()).arg(
                        Arg::new("unread")
                            .long("unread")
                            .action(ArgAction::SetTrue),
                    ),
                ))
                .subcommand(
                    Command::new("read").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("export").subcommand(
                Command::new("expenses")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("json")
                            .help("csv|json"),
                    )
                    .arg(req("out", "Output path")),
            ),
        )
        .subcommand(
            Command::new("import").subcommand(
                Command::new("expenses").arg(req("path", "JSON file with an array of expenses")),
            ),
        )
}
