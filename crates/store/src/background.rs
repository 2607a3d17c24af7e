// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background workflow records and the append-only intervention log.
//!
//! Status transitions form a DAG enforced at the store layer:
//! Queued → Running → {Completed, Failed, Cancelled, Suspended}, with
//! Suspended → Running on restore. Illegal transitions leave the row
//! unchanged and surface an error.

use crate::db::Store;
use crate::error::StoreError;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Suspended,
}

aria_core::simple_display! {
    BackgroundStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Suspended => "suspended",
    }
}

impl FromStr for BackgroundStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "suspended" => Ok(Self::Suspended),
            other => Err(StoreError::UnknownValue {
                what: "background status",
                value: other.to_string(),
            }),
        }
    }
}

impl BackgroundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The legal transition DAG.
    pub fn can_transition(&self, to: BackgroundStatus) -> bool {
        use BackgroundStatus::*;
        matches!(
            (self, to),
            (Queued, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Running, Suspended)
                | (Suspended, Running)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRecord {
    pub task_id: String,
    pub workflow_type: String,
    pub trigger_conditions: Value,
    pub status: BackgroundStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub last_check_at_ms: Option<u64>,
    pub next_check_at_ms: Option<u64>,
    pub metadata: Value,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterventionRecord {
    pub id: i64,
    pub task_id: String,
    pub action: String,
    pub parameters: Value,
    pub performed_at_ms: u64,
    pub performed_by: String,
    pub result: String,
}

const RECORD_COLUMNS: &str = "task_id, workflow_type, trigger_conditions, status, created_at, \
     updated_at, last_check_at, next_check_at, metadata, error_message";

fn record_from_row(row: &Row<'_>) -> Result<BackgroundRecord, rusqlite::Error> {
    let status: String = row.get(3)?;
    let trigger: String = row.get(2)?;
    let metadata: String = row.get(8)?;
    Ok(BackgroundRecord {
        task_id: row.get(0)?,
        workflow_type: row.get(1)?,
        trigger_conditions: serde_json::from_str(&trigger).unwrap_or(Value::Null),
        status: status.parse().unwrap_or(BackgroundStatus::Failed),
        created_at_ms: row.get::<_, i64>(4)? as u64,
        updated_at_ms: row.get::<_, i64>(5)? as u64,
        last_check_at_ms: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        next_check_at_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
        error_message: row.get(9)?,
    })
}

impl Store {
    /// Insert a new record in `Queued` status.
    pub fn insert_background(
        &self,
        task_id: &str,
        workflow_type: &str,
        trigger_conditions: &Value,
        metadata: &Value,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let trigger = serde_json::to_string(trigger_conditions)?;
        let meta = serde_json::to_string(metadata)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO background_workflows \
                 (task_id, workflow_type, trigger_conditions, status, created_at, updated_at, metadata) \
                 VALUES (?1, ?2, ?3, 'queued', ?4, ?4, ?5)",
                params![task_id, workflow_type, trigger, now_ms as i64, meta],
            )?;
            Ok(())
        })
    }

    pub fn background(&self, task_id: &str) -> Result<Option<BackgroundRecord>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM background_workflows WHERE task_id = ?1"),
                params![task_id],
                record_from_row,
            )
            .optional()
        })
    }

    pub fn backgrounds_with_status(
        &self,
        status: BackgroundStatus,
    ) -> Result<Vec<BackgroundRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM background_workflows \
                 WHERE status = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map(params![status.to_string()], record_from_row)?;
            rows.collect()
        })
    }

    /// Transition a record's status, enforcing the DAG in one transaction.
    /// An illegal transition leaves the row unchanged.
    pub fn set_background_status(
        &self,
        task_id: &str,
        to: BackgroundStatus,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let (current, updated) = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    "SELECT status FROM background_workflows WHERE task_id = ?1",
                    params![task_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            let mut updated = false;
            if let Some(ref status) = current {
                if let Ok(from) = status.parse::<BackgroundStatus>() {
                    if from.can_transition(to) {
                        tx.execute(
                            "UPDATE background_workflows SET status = ?2, updated_at = ?3 \
                             WHERE task_id = ?1",
                            params![task_id, to.to_string(), now_ms as i64],
                        )?;
                        updated = true;
                    }
                }
            }
            tx.commit()?;
            Ok((current, updated))
        })?;

        if updated {
            return Ok(());
        }
        match current {
            None => Err(StoreError::TaskNotFound(task_id.to_string())),
            Some(status) => {
                let from: BackgroundStatus = status.parse()?;
                Err(StoreError::InvalidTransition {
                    task_id: task_id.to_string(),
                    from,
                    to,
                })
            }
        }
    }

    /// Record a check pass and when the next one is due.
    pub fn record_check(
        &self,
        task_id: &str,
        now_ms: u64,
        next_check_at_ms: Option<u64>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE background_workflows \
                 SET last_check_at = ?2, next_check_at = ?3, updated_at = ?2 \
                 WHERE task_id = ?1",
                params![
                    task_id,
                    now_ms as i64,
                    next_check_at_ms.map(|v| v as i64)
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_background_error(
        &self,
        task_id: &str,
        error: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE background_workflows SET error_message = ?2, updated_at = ?3 \
                 WHERE task_id = ?1",
                params![task_id, error, now_ms as i64],
            )?;
            Ok(())
        })
    }

    /// Append to the intervention log (never updated, never deleted).
    pub fn add_intervention(
        &self,
        task_id: &str,
        action: &str,
        parameters: &Value,
        performed_by: &str,
        result: &str,
        now_ms: u64,
    ) -> Result<i64, StoreError> {
        let parameters = serde_json::to_string(parameters)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_interventions \
                 (task_id, action, parameters, performed_at, performed_by, result) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![task_id, action, parameters, now_ms as i64, performed_by, result],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn interventions(&self, task_id: &str) -> Result<Vec<InterventionRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, action, parameters, performed_at, performed_by, result \
                 FROM workflow_interventions WHERE task_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![task_id], |row| {
                let parameters: String = row.get(3)?;
                Ok(InterventionRecord {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    action: row.get(2)?,
                    parameters: serde_json::from_str(&parameters).unwrap_or(Value::Null),
                    performed_at_ms: row.get::<_, i64>(4)? as u64,
                    performed_by: row.get(5)?,
                    result: row.get(6)?,
                })
            })?;
            rows.collect()
        })
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
