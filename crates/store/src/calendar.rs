// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar events with per-stage notification tracking.

use crate::db::Store;
use crate::error::StoreError;
use crate::stage::NotificationStage;
use rusqlite::{params, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: i64,
    pub summary: String,
    pub description: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub location: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub last_notified_at_ms: Option<u64>,
    pub last_notified_stage: Option<NotificationStage>,
}

fn event_from_row(row: &Row<'_>) -> Result<CalendarEvent, rusqlite::Error> {
    let stage: Option<String> = row.get(9)?;
    Ok(CalendarEvent {
        id: row.get(0)?,
        summary: row.get(1)?,
        description: row.get(2)?,
        start_ms: row.get::<_, i64>(3)? as u64,
        end_ms: row.get::<_, i64>(4)? as u64,
        location: row.get(5)?,
        created_at_ms: row.get::<_, i64>(6)? as u64,
        updated_at_ms: row.get::<_, i64>(7)? as u64,
        last_notified_at_ms: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        last_notified_stage: stage.and_then(|s| s.parse().ok()),
    })
}

const EVENT_COLUMNS: &str = "id, summary, description, start_time, end_time, location, \
     created_at, updated_at, last_notified_at, last_notified_stage";

impl Store {
    pub fn add_calendar_event(
        &self,
        summary: &str,
        description: &str,
        start_ms: u64,
        end_ms: u64,
        location: &str,
        now_ms: u64,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO calendar_events \
                 (summary, description, start_time, end_time, location, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    summary,
                    description,
                    start_ms as i64,
                    end_ms as i64,
                    location,
                    now_ms as i64
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Events that have not started yet, soonest first.
    pub fn upcoming_calendar_events(&self, now_ms: u64) -> Result<Vec<CalendarEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events \
                 WHERE start_time > ?1 ORDER BY start_time"
            ))?;
            let rows = stmt.query_map(params![now_ms as i64], event_from_row)?;
            rows.collect()
        })
    }

    /// Events whose end time falls inside the trailing window (startup
    /// report: "ended in the past 24 h").
    pub fn recently_ended_events(
        &self,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<Vec<CalendarEvent>, StoreError> {
        let floor = now_ms.saturating_sub(window_ms);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events \
                 WHERE end_time > ?1 AND end_time <= ?2 ORDER BY end_time"
            ))?;
            let rows = stmt.query_map(params![floor as i64, now_ms as i64], event_from_row)?;
            rows.collect()
        })
    }

    /// Record that `stage` was notified for the event.
    pub fn set_calendar_stage(
        &self,
        id: i64,
        stage: NotificationStage,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE calendar_events \
                 SET last_notified_stage = ?2, last_notified_at = ?3, updated_at = ?3 \
                 WHERE id = ?1",
                params![id, stage.to_string(), now_ms as i64],
            )?;
            Ok(())
        })
    }

    pub fn calendar_event(&self, id: i64) -> Result<Option<CalendarEvent>, StoreError> {
        use rusqlite::OptionalExtension;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1"),
                params![id],
                event_from_row,
            )
            .optional()
        })
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
