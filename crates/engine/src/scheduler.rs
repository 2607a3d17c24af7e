// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled-event driver: one ticker polling storage for due reminders,
//! calendar staging, and TODO staging.
//!
//! Staging is idempotent per stage: an entity's `last_notified_stage` is
//! compared before publishing, so the same stage never fires twice.

use aria_core::{event_data, Clock, EventBus, EventKind};
use aria_store::{NotificationStage, Store};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default poll interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// Window for "recently ended" calendar events in the startup report.
const STARTUP_ENDED_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Bounded join on stop.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct DriverInner {
    store: Store,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

/// Single-ticker scheduler for time-based events.
pub struct ScheduledEventDriver {
    inner: Arc<DriverInner>,
    token: CancellationToken,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ScheduledEventDriver {
    pub fn new(store: Store, bus: Arc<EventBus>, clock: Arc<dyn Clock>, tick: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(DriverInner { store, bus, clock, tick }),
            token: CancellationToken::new(),
            handle: Mutex::new(None),
        })
    }

    /// Spawn the ticker loop. Idempotent.
    pub fn start(&self) {
        let mut slot = self.handle.lock();
        if slot.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let token = self.token.clone();
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(inner.tick) => inner.run_tick(),
                }
            }
            tracing::debug!("scheduled-event driver stopped");
        }));
    }

    /// Signal the ticker and join briefly.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else { return };
        self.token.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("scheduled-event driver did not stop in time");
        }
    }

    /// One poll pass. Public so tests (and the startup path) can drive
    /// ticks without waiting on wall-clock time.
    pub fn run_tick(&self) {
        self.inner.run_tick();
    }

    /// Publish the one-time startup report: overdue pending TODOs, already
    /// past reminders, and calendar events that ended in the last 24 h.
    pub fn publish_startup_report(&self) {
        self.inner.publish_startup_report();
    }
}

impl DriverInner {
    fn run_tick(&self) {
        let now = self.clock.epoch_ms();
        self.fire_due_reminders(now);
        self.stage_calendar_events(now);
        self.stage_todos(now);
    }

    fn fire_due_reminders(&self, now: u64) {
        let due = match self.store.due_reminders(now) {
            Ok(due) => due,
            Err(e) => {
                // Next tick may succeed; the ticker keeps going.
                tracing::warn!(error = %e, "reminder poll failed");
                return;
            }
        };
        for reminder in due {
            tracing::info!(reminder_id = reminder.id, "reminder fired");
            self.bus.publish(
                EventKind::ReminderTriggered,
                event_data! {
                    "reminder_id" => reminder.id,
                    "message" => reminder.message.as_str(),
                    "fire_time" => reminder.fire_at_ms,
                },
                "scheduler",
            );
            if let Err(e) = self.store.delete_reminder(reminder.id) {
                tracing::warn!(reminder_id = reminder.id, error = %e, "fired reminder not deleted");
            }
        }
    }

    fn stage_calendar_events(&self, now: u64) {
        let upcoming = match self.store.upcoming_calendar_events(now) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "calendar poll failed");
                return;
            }
        };
        for event in upcoming {
            let Some(stage) = NotificationStage::for_event_start(event.start_ms, now) else {
                continue;
            };
            if event.last_notified_stage == Some(stage) {
                continue;
            }
            tracing::info!(event_id = event.id, stage = %stage, "calendar event staging");
            self.bus.publish(
                EventKind::CalendarEventStarting,
                event_data! {
                    "event_id" => event.id,
                    "summary" => event.summary.as_str(),
                    "stage" => stage.to_string(),
                    "start_time" => event.start_ms,
                    "location" => event.location.as_str(),
                },
                "scheduler",
            );
            if let Err(e) = self.store.set_calendar_stage(event.id, stage, now) {
                tracing::warn!(event_id = event.id, error = %e, "calendar stage not persisted");
            }
        }
    }

    fn stage_todos(&self, now: u64) {
        let pending = match self.store.pending_todos() {
            Ok(todos) => todos,
            Err(e) => {
                tracing::warn!(error = %e, "todo poll failed");
                return;
            }
        };
        for todo in pending {
            let Some(deadline) = todo.deadline_ms else { continue };
            let Some(stage) = NotificationStage::for_deadline(deadline, now) else {
                continue;
            };
            if todo.last_notified_stage == Some(stage) {
                continue;
            }
            let kind = if stage == NotificationStage::AtDeadline {
                EventKind::TodoOverdue
            } else {
                EventKind::TodoUpcoming
            };
            tracing::info!(todo_id = todo.id, stage = %stage, "todo staging");
            self.bus.publish(
                kind,
                event_data! {
                    "todo_id" => todo.id,
                    "task_name" => todo.name.as_str(),
                    "priority" => todo.priority.to_string(),
                    "stage" => stage.to_string(),
                    "deadline" => deadline,
                },
                "scheduler",
            );
            if let Err(e) = self.store.set_todo_stage(todo.id, stage, now) {
                tracing::warn!(todo_id = todo.id, error = %e, "todo stage not persisted");
            }
        }
    }

    fn publish_startup_report(&self) {
        let now = self.clock.epoch_ms();
        let overdue_todos = self
            .store
            .overdue_pending_todos(now)
            .map(|v| v.iter().map(|t| t.id).collect::<Vec<_>>())
            .unwrap_or_default();
        let past_reminders = self
            .store
            .due_reminders(now)
            .map(|v| v.iter().map(|r| r.id).collect::<Vec<_>>())
            .unwrap_or_default();
        let ended_events = self
            .store
            .recently_ended_events(now, STARTUP_ENDED_WINDOW_MS)
            .map(|v| v.iter().map(|e| e.id).collect::<Vec<_>>())
            .unwrap_or_default();

        tracing::info!(
            overdue_todos = overdue_todos.len(),
            past_reminders = past_reminders.len(),
            ended_events = ended_events.len(),
            "startup report"
        );
        self.bus.publish(
            EventKind::SystemStartupReport,
            event_data! {
                "overdue_todo_count" => overdue_todos.len() as i64,
                "overdue_todo_ids" => overdue_todos,
                "past_reminder_count" => past_reminders.len() as i64,
                "past_reminder_ids" => past_reminders,
                "recently_ended_event_count" => ended_events.len() as i64,
                "recently_ended_event_ids" => ended_events,
            },
            "scheduler",
        );
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
