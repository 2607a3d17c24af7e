// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller: sequences layer-completion events into discrete cycles and
//! enforces the pending-end contract at cycle boundaries.
//!
//! A cycle opens on `input_layer_complete` and closes on
//! `output_layer_complete` with a `cycle_completed`; only then are
//! `pending_end` sessions finalized and their engines dropped.

use crate::EngineMap;
use aria_core::{event_data, CycleId, Event, EventBus, EventKind, Handler, SessionId, SessionStore};
use aria_store::{TaskSnapshot, TaskSnapshotEntry};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Permits for the short-lived step-execution runner.
const STEP_RUNNER_PERMITS: usize = 4;

/// Completed-task history kept in memory and in the snapshot.
const TASK_HISTORY_LIMIT: usize = 50;

/// One tracked background task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEntry {
    pub task_id: String,
    pub workflow_type: String,
    pub session_id: Option<String>,
    pub status: String,
    pub started_at_ms: u64,
}

/// In-memory index of background tasks plus a bounded completion history.
#[derive(Default)]
pub struct TaskRegistry {
    entries: HashMap<String, TaskEntry>,
    history: VecDeque<TaskEntry>,
}

impl TaskRegistry {
    fn upsert(&mut self, entry: TaskEntry) {
        self.entries.insert(entry.task_id.clone(), entry);
    }

    fn set_status(&mut self, task_id: &str, status: &str) {
        if let Some(entry) = self.entries.get_mut(task_id) {
            entry.status = status.to_string();
            if matches!(status, "completed" | "failed" | "cancelled") {
                if self.history.len() == TASK_HISTORY_LIMIT {
                    self.history.pop_front();
                }
                self.history.push_back(entry.clone());
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskEntry> {
        self.entries.get(task_id)
    }

    pub fn entries(&self) -> Vec<TaskEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn history(&self) -> Vec<TaskEntry> {
        self.history.iter().cloned().collect()
    }

    fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            entries: self
                .entries
                .values()
                .map(|e| TaskSnapshotEntry {
                    task_id: e.task_id.clone(),
                    workflow_type: e.workflow_type.clone(),
                    session_id: e.session_id.clone(),
                    status: e.status.clone(),
                    started_at_ms: e.started_at_ms,
                })
                .collect(),
        }
    }

    fn absorb(&mut self, snapshot: TaskSnapshot) {
        for entry in snapshot.entries {
            self.entries.insert(
                entry.task_id.clone(),
                TaskEntry {
                    task_id: entry.task_id,
                    workflow_type: entry.workflow_type,
                    session_id: entry.session_id,
                    status: entry.status,
                    started_at_ms: entry.started_at_ms,
                },
            );
        }
    }
}

struct ControllerInner {
    bus: Arc<EventBus>,
    sessions: Arc<SessionStore>,
    engines: EngineMap,
    cycle: Mutex<Option<CycleId>>,
    registry: Mutex<TaskRegistry>,
    snapshot_path: PathBuf,
    step_runner: Arc<Semaphore>,
}

/// Cycle orchestration and the background task registry.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

impl Controller {
    pub fn new(
        bus: Arc<EventBus>,
        sessions: Arc<SessionStore>,
        engines: EngineMap,
        snapshot_path: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                bus,
                sessions,
                engines,
                cycle: Mutex::new(None),
                registry: Mutex::new(TaskRegistry::default()),
                snapshot_path,
                step_runner: Arc::new(Semaphore::new(STEP_RUNNER_PERMITS)),
            }),
        }
    }

    /// Subscribe the controller's handlers. Call once, before the bus
    /// starts delivering.
    pub fn attach(&self) {
        let bus = &self.inner.bus;

        let c = self.clone();
        bus.subscribe(
            EventKind::InputLayerComplete,
            Arc::new(move |_event: &Event| {
                c.open_cycle();
                Ok(())
            }) as Handler,
            "controller.input",
        );

        let c = self.clone();
        bus.subscribe(
            EventKind::ProcessingLayerComplete,
            Arc::new(move |_event: &Event| {
                c.drive_pending_steps();
                Ok(())
            }) as Handler,
            "controller.processing",
        );

        let c = self.clone();
        bus.subscribe(
            EventKind::OutputLayerComplete,
            Arc::new(move |_event: &Event| {
                c.close_cycle();
                Ok(())
            }) as Handler,
            "controller.output",
        );

        let c = self.clone();
        bus.subscribe(
            EventKind::CycleCompleted,
            Arc::new(move |_event: &Event| {
                c.finalize_cycle_boundary();
                Ok(())
            }) as Handler,
            "controller.boundary",
        );

        for kind in [
            EventKind::BackgroundWorkflowCompleted,
            EventKind::BackgroundWorkflowFailed,
            EventKind::BackgroundWorkflowCancelled,
        ] {
            let c = self.clone();
            bus.subscribe(
                kind,
                Arc::new(move |event: &Event| {
                    c.record_background_outcome(event);
                    Ok(())
                }) as Handler,
                "controller.background",
            );
        }
    }

    fn open_cycle(&self) {
        let mut cycle = self.inner.cycle.lock();
        if let Some(current) = cycle.as_ref() {
            // Absorbed into the running cycle; exactly one cycle_completed
            // per cycle_started.
            tracing::warn!(cycle_id = %current, "input completed while a cycle is open");
            return;
        }
        let id = CycleId::new();
        *cycle = Some(id);
        drop(cycle);
        tracing::debug!(cycle_id = %id, "cycle opened");
        self.inner.bus.publish(
            EventKind::CycleStarted,
            event_data! { "cycle_id" => id.as_str() },
            "controller",
        );
    }

    fn close_cycle(&self) {
        let Some(id) = self.inner.cycle.lock().take() else {
            tracing::warn!("output completed with no open cycle");
            return;
        };
        tracing::debug!(cycle_id = %id, "cycle closed");
        self.inner.bus.publish(
            EventKind::CycleCompleted,
            event_data! { "cycle_id" => id.as_str() },
            "controller",
        );
    }

    /// On the cycle boundary: finalize pending-end sessions and drop the
    /// engines of sessions that just ended.
    fn finalize_cycle_boundary(&self) {
        let ended = self.inner.sessions.finalize_pending(&self.inner.bus);
        if ended.is_empty() {
            return;
        }
        let mut engines = self.inner.engines.lock();
        for session_id in &ended {
            if engines.remove(session_id).is_some() {
                tracing::debug!(session_id = %session_id, "engine dropped at cycle boundary");
            }
        }
    }

    /// Drive any runnable workflow engine forward on the step runner.
    ///
    /// Runnable means: not complete, not parked on input, not review
    /// gated. The engine publishes its own step events as it advances.
    fn drive_pending_steps(&self) {
        let runnable: Vec<(SessionId, Arc<Mutex<aria_workflow::WorkflowEngine>>)> = {
            let engines = self.inner.engines.lock();
            engines
                .iter()
                .filter(|(_, engine)| {
                    let engine = engine.lock();
                    !engine.is_complete() && !engine.requires_input() && !engine.awaiting_llm_review()
                })
                .map(|(id, engine)| (*id, Arc::clone(engine)))
                .collect()
        };

        for (session_id, engine) in runnable {
            let permits = Arc::clone(&self.inner.step_runner);
            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire().await else { return };
                let outcome = engine.lock().process_input(None);
                if let Err(e) = outcome {
                    tracing::warn!(session_id = %session_id, error = %e, "step runner advance failed");
                }
            });
        }
    }

    fn record_background_outcome(&self, event: &Event) {
        let Some(task_id) = event.str_field("task_id") else { return };
        let status = match event.kind {
            EventKind::BackgroundWorkflowCompleted => "completed",
            EventKind::BackgroundWorkflowFailed => "failed",
            EventKind::BackgroundWorkflowCancelled => "cancelled",
            _ => return,
        };
        {
            let mut registry = self.inner.registry.lock();
            registry.set_status(task_id, status);
        }
        self.save_snapshot();
    }

    /// Track a newly submitted background task.
    pub fn register_task(&self, entry: TaskEntry) {
        self.inner.registry.lock().upsert(entry);
        self.save_snapshot();
    }

    pub fn task(&self, task_id: &str) -> Option<TaskEntry> {
        self.inner.registry.lock().get(task_id).cloned()
    }

    pub fn tasks(&self) -> Vec<TaskEntry> {
        self.inner.registry.lock().entries()
    }

    pub fn task_history(&self) -> Vec<TaskEntry> {
        self.inner.registry.lock().history()
    }

    pub fn current_cycle(&self) -> Option<CycleId> {
        *self.inner.cycle.lock()
    }

    /// Reload the registry snapshot from disk (best-effort).
    pub fn load_snapshot(&self) {
        let snapshot = TaskSnapshot::load(&self.inner.snapshot_path);
        if !snapshot.entries.is_empty() {
            tracing::info!(entries = snapshot.entries.len(), "task registry restored");
        }
        self.inner.registry.lock().absorb(snapshot);
    }

    /// Persist the registry snapshot (best-effort; loss is non-fatal).
    pub fn save_snapshot(&self) {
        let snapshot = self.inner.registry.lock().snapshot();
        if let Err(e) = snapshot.save(&self.inner.snapshot_path) {
            tracing::warn!(error = %e, "task snapshot not saved");
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
