// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TODO items with deadline staging.

use crate::db::Store;
use crate::error::StoreError;
use crate::stage::NotificationStage;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriority {
    High,
    Medium,
    Low,
    None,
}

aria_core::simple_display! {
    TodoPriority {
        High => "high",
        Medium => "medium",
        Low => "low",
        None => "none",
    }
}

impl FromStr for TodoPriority {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "none" => Ok(Self::None),
            other => Err(StoreError::UnknownValue {
                what: "todo priority",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    Completed,
}

aria_core::simple_display! {
    TodoStatus {
        Pending => "pending",
        Completed => "completed",
    }
}

impl FromStr for TodoStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(StoreError::UnknownValue {
                what: "todo status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub priority: TodoPriority,
    pub status: TodoStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub deadline_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub last_notified_at_ms: Option<u64>,
    pub last_notified_stage: Option<NotificationStage>,
}

const TODO_COLUMNS: &str = "id, task_name, task_description, priority, status, created_at, \
     updated_at, deadline, completed_at, last_notified_at, last_notified_stage";

fn todo_from_row(row: &Row<'_>) -> Result<TodoItem, rusqlite::Error> {
    let priority: String = row.get(3)?;
    let status: String = row.get(4)?;
    let stage: Option<String> = row.get(10)?;
    Ok(TodoItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        priority: priority.parse().unwrap_or(TodoPriority::None),
        status: status.parse().unwrap_or(TodoStatus::Pending),
        created_at_ms: row.get::<_, i64>(5)? as u64,
        updated_at_ms: row.get::<_, i64>(6)? as u64,
        deadline_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        completed_at_ms: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        last_notified_at_ms: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        last_notified_stage: stage.and_then(|s| s.parse().ok()),
    })
}

impl Store {
    pub fn add_todo(
        &self,
        name: &str,
        description: &str,
        priority: TodoPriority,
        deadline_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos \
                 (task_name, task_description, priority, status, created_at, updated_at, deadline) \
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?4, ?5)",
                params![
                    name,
                    description,
                    priority.to_string(),
                    now_ms as i64,
                    deadline_ms.map(|v| v as i64)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All pending TODOs, earliest deadline first (no-deadline items last).
    pub fn pending_todos(&self) -> Result<Vec<TodoItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE status = 'pending' \
                 ORDER BY deadline IS NULL, deadline"
            ))?;
            let rows = stmt.query_map([], todo_from_row)?;
            rows.collect()
        })
    }

    /// Pending TODOs whose deadline has passed.
    pub fn overdue_pending_todos(&self, now_ms: u64) -> Result<Vec<TodoItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos \
                 WHERE status = 'pending' AND deadline IS NOT NULL AND deadline <= ?1 \
                 ORDER BY deadline"
            ))?;
            let rows = stmt.query_map(params![now_ms as i64], todo_from_row)?;
            rows.collect()
        })
    }

    pub fn set_todo_stage(
        &self,
        id: i64,
        stage: NotificationStage,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE todos \
                 SET last_notified_stage = ?2, last_notified_at = ?3, updated_at = ?3 \
                 WHERE id = ?1",
                params![id, stage.to_string(), now_ms as i64],
            )?;
            Ok(())
        })
    }

    pub fn complete_todo(&self, id: i64, now_ms: u64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE todos SET status = 'completed', completed_at = ?2, updated_at = ?2 \
                 WHERE id = ?1",
                params![id, now_ms as i64],
            )?;
            Ok(())
        })
    }

    pub fn todo(&self, id: i64) -> Result<Option<TodoItem>, StoreError> {
        use rusqlite::OptionalExtension;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
                params![id],
                todo_from_row,
            )
            .optional()
        })
    }
}

#[cfg(test)]
#[path = "todos_tests.rs"]
mod tests;
