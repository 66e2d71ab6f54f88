// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Best-effort delivery of notifications. Nothing here ever fails the caller.

use crate::config;
use crate::models::{KIND_SETTLEMENT_REQUEST, Notification};
use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, info, warn};

pub trait NotificationSink {
    /// Short name for logs.
    fn label(&self) -> &'static str;
    fn deliver(&self, notification: &Notification);
}

/// Human-readable text for a notification.
pub fn message_for(n: &Notification) -> String {
    let what = n.expense_description.as_deref().unwrap_or("an expense");
    let mut msg = if n.kind == KIND_SETTLEMENT_REQUEST {
        format!(
            "{} says they settled {} for '{}'",
            n.from_user,
            n.amount.round_dp(2),
            what
        )
    } else {
        format!("{} sent you an update about '{}'", n.from_user, what)
    };
    if let Some(note) = n.note.as_deref() {
        msg.push_str(": ");
        msg.push_str(note);
    }
    msg
}

/// Only writes to the log; the inbox row is the delivery.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn label(&self) -> &'static str {
        "log"
    }

    fn deliver(&self, n: &Notification) {
        info!(to = n.to_user.as_str(), kind = n.kind.as_str(), "{}", message_for(n));
    }
}

/// POSTs a push-style payload to a webhook.
pub struct WebhookSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: url.trim().to_string(),
            client: crate::utils::http_client()?,
        })
    }

    pub fn payload(n: &Notification) -> serde_json::Value {
        json!({
            "topic": n.to_user,
            "notification": {
                "title": format!("Settlement request from {}", n.from_user),
                "body": message_for(n),
            },
            "data": n,
        })
    }
}

impl NotificationSink for WebhookSink {
    fn label(&self) -> &'static str {
        "webhook"
    }

    fn deliver(&self, n: &Notification) {
        match self.client.post(&self.url).json(&Self::payload(n)).send() {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = self.url.as_str(), id = n.id, "notification delivered");
            }
            Ok(resp) => {
                warn!(url = self.url.as_str(), status = %resp.status(), "notification webhook rejected");
            }
            Err(e) => {
                warn!(url = self.url.as_str(), error = %e, "notification webhook failed");
            }
        }
    }
}

/// Webhook when `notify_webhook` is configured, otherwise log only.
pub fn sink_from_settings(conn: &Connection) -> Result<Box<dyn NotificationSink>> {
    match config::get_setting(conn, config::NOTIFY_WEBHOOK)? {
        Some(url) if !url.trim().is_empty() => Ok(Box::new(WebhookSink::new(&url)?)),
        _ => Ok(Box::new(LogSink)),
    }
}
