// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Expense '{id}' not found")]
    ExpenseNotFound { id: String },

    #[error("Expense '{id}' already exists")]
    DuplicateExpense { id: String },

    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Notification {id} not found")]
    NotificationNotFound { id: i64 },

    #[error("Friend '{name}' not found")]
    FriendNotFound { name: String },

    #[error("Friend '{name}' already exists")]
    DuplicateFriend { name: String },

    #[error("Invalid friend: {0}")]
    InvalidFriend(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
