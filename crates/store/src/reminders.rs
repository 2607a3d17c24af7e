// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot reminders: fire once, then the row is deleted.

use crate::db::Store;
use crate::error::StoreError;
use rusqlite::params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub fire_at_ms: u64,
    pub message: String,
}

impl Store {
    /// Insert a reminder; returns its id.
    pub fn add_reminder(&self, fire_at_ms: u64, message: &str) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reminders (time, message) VALUES (?1, ?2)",
                params![fire_at_ms as i64, message],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Reminders whose fire time has arrived.
    pub fn due_reminders(&self, now_ms: u64) -> Result<Vec<Reminder>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, time, message FROM reminders WHERE time <= ?1 ORDER BY time")?;
            let rows = stmt.query_map(params![now_ms as i64], |row| {
                Ok(Reminder {
                    id: row.get(0)?,
                    fire_at_ms: row.get::<_, i64>(1)? as u64,
                    message: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn delete_reminder(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn all_reminders(&self) -> Result<Vec<Reminder>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, time, message FROM reminders ORDER BY time")?;
            let rows = stmt.query_map([], |row| {
                Ok(Reminder {
                    id: row.get(0)?,
                    fire_at_ms: row.get::<_, i64>(1)? as u64,
                    message: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }
}

#[cfg(test)]
#[path = "reminders_tests.rs"]
mod tests;
