// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the store crate.

use crate::background::BackgroundStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("background task not found: {0}")]
    TaskNotFound(String),

    #[error("illegal status transition {from} -> {to} for task {task_id}")]
    InvalidTransition {
        task_id: String,
        from: BackgroundStatus,
        to: BackgroundStatus,
    },

    #[error("unknown enum value `{value}` for {what}")]
    UnknownValue { what: &'static str, value: String },

    #[error("sidecar io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sidecar serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
