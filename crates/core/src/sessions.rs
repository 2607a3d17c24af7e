// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store: ownership and lifecycle of chatting and workflow sessions.
//!
//! Finalization is deferred: `mark_for_end` only flags a session, and
//! [`SessionStore::finalize_pending`] — invoked on every `cycle_completed` —
//! performs the actual teardown. That single rule keeps "the system says
//! goodbye *before* the session dies".

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::error::SessionError;
use crate::event::EventKind;
use crate::event_data;
use crate::id::SessionId;
use crate::session::{Session, SessionKind, SessionStatus, StepTrace, WorkflowInfo};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Authoritative map of live sessions.
///
/// One store-wide mutex serializes every lookup-and-modify; critical
/// sections stay short (no step execution happens under this lock except
/// the closure passed to [`SessionStore::with_session_data`]).
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Create a chatting session and publish `session_started`.
    pub fn create_chat_session(&self, bus: &Arc<EventBus>) -> SessionId {
        let session = Session::new(SessionKind::Chatting, self.clock.epoch_ms());
        let id = session.id;
        self.sessions.lock().insert(id, session);
        bus.publish(
            EventKind::SessionStarted,
            event_data! { "session_id" => id.as_str(), "kind" => "chatting" },
            "session_store",
        );
        id
    }

    /// Create a workflow session and publish `session_started`.
    ///
    /// At most one workflow session may be active at any moment; a second
    /// create is refused with the id of the one already running.
    pub fn create_workflow_session(
        &self,
        bus: &Arc<EventBus>,
        workflow_type: impl Into<String>,
        command: impl Into<String>,
    ) -> Result<SessionId, SessionError> {
        let info = WorkflowInfo {
            workflow_type: workflow_type.into(),
            command: command.into(),
            step_history: Vec::new(),
            current_step: None,
        };
        let id = {
            let mut sessions = self.sessions.lock();
            if let Some(existing) = sessions
                .values()
                .find(|s| s.kind.is_workflow() && s.is_active())
            {
                return Err(SessionError::WorkflowAlreadyActive(existing.id.to_string()));
            }
            let session = Session::new(SessionKind::Workflow(info), self.clock.epoch_ms());
            let id = session.id;
            sessions.insert(id, session);
            id
        };
        bus.publish(
            EventKind::SessionStarted,
            event_data! { "session_id" => id.as_str(), "kind" => "workflow" },
            "session_store",
        );
        Ok(id)
    }

    /// Snapshot of a session.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Workflow info snapshot, erroring when the session is missing or not
    /// a workflow session.
    pub fn workflow_info(&self, id: &SessionId) -> Result<WorkflowInfo, SessionError> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session
            .workflow()
            .cloned()
            .ok_or_else(|| SessionError::NotAWorkflow(id.to_string()))
    }

    /// Snapshots of all active sessions.
    pub fn active_sessions(&self) -> Vec<Session> {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Id of the single active workflow session, if one exists.
    pub fn active_workflow_session(&self) -> Option<SessionId> {
        self.sessions
            .lock()
            .values()
            .find(|s| s.kind.is_workflow() && s.is_active())
            .map(|s| s.id)
    }

    /// Ids of all active workflow sessions (at most one by invariant, but
    /// callers iterate rather than assume).
    pub fn active_workflow_session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.kind.is_workflow() && s.is_active())
            .map(|s| s.id)
            .collect()
    }

    /// Flag a session for finalization at the next cycle boundary.
    ///
    /// `final_status` must be terminal; it is applied by
    /// [`SessionStore::finalize_pending`].
    pub fn mark_for_end(
        &self,
        id: &SessionId,
        reason: impl Into<String>,
        final_status: SessionStatus,
    ) -> Result<(), SessionError> {
        if !final_status.is_terminal() {
            return Err(SessionError::NotTerminal { status: final_status });
        }
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if !session.is_active() {
            return Err(SessionError::NotActive(id.to_string()));
        }
        session.pending_end = true;
        session.pending_end_reason = Some(reason.into());
        session.pending_final_status = Some(final_status);
        tracing::debug!(session_id = %id, status = %final_status, "session marked for end");
        Ok(())
    }

    /// Finalize a session immediately (bypassing the cycle boundary).
    ///
    /// Reserved for teardown paths where no further cycle will run, e.g.
    /// runtime shutdown. Publishes `session_ended` exactly once.
    pub fn end_session(
        &self,
        bus: &Arc<EventBus>,
        id: &SessionId,
        reason: impl Into<String>,
        final_status: SessionStatus,
    ) -> Result<(), SessionError> {
        if !final_status.is_terminal() {
            return Err(SessionError::NotTerminal { status: final_status });
        }
        let reason = reason.into();
        {
            let mut sessions = self.sessions.lock();
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            if !session.is_active() {
                return Err(SessionError::NotActive(id.to_string()));
            }
            session.status = final_status;
            session.pending_end = false;
            session.pending_end_reason = Some(reason.clone());
        }
        self.publish_ended(bus, id, &reason, final_status);
        Ok(())
    }

    /// Finalize every `pending_end` session and publish `session_ended` for
    /// each. Invoked on every `cycle_completed`. Returns the finalized ids.
    pub fn finalize_pending(&self, bus: &Arc<EventBus>) -> Vec<SessionId> {
        let finalized: Vec<(SessionId, String, SessionStatus)> = {
            let mut sessions = self.sessions.lock();
            sessions
                .values_mut()
                .filter(|s| s.pending_end && s.is_active())
                .map(|s| {
                    let status = s.pending_final_status.unwrap_or(SessionStatus::Completed);
                    s.status = status;
                    s.pending_end = false;
                    let reason = s
                        .pending_end_reason
                        .clone()
                        .unwrap_or_else(|| "session complete".to_string());
                    (s.id, reason, status)
                })
                .collect()
        };
        for (id, reason, status) in &finalized {
            self.publish_ended(bus, id, reason, *status);
        }
        finalized.into_iter().map(|(id, _, _)| id).collect()
    }

    fn publish_ended(
        &self,
        bus: &Arc<EventBus>,
        id: &SessionId,
        reason: &str,
        status: SessionStatus,
    ) {
        tracing::info!(session_id = %id, status = %status, reason, "session ended");
        bus.publish(
            EventKind::SessionEnded,
            event_data! {
                "session_id" => id.as_str(),
                "status" => status.to_string(),
                "reason" => reason,
            },
            "session_store",
        );
    }

    /// Write a key into the session-scoped working data.
    pub fn add_data(
        &self,
        id: &SessionId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.data.set(key, value);
        session.last_activity_ms = self.clock.epoch_ms();
        Ok(())
    }

    /// Read a key from the session-scoped working data. Absent sessions and
    /// absent keys both read as `None`; an empty string is a present value.
    pub fn get_data(&self, id: &SessionId, key: &str) -> Option<Value> {
        self.sessions
            .lock()
            .get(id)
            .and_then(|s| s.data.get(key).cloned())
    }

    /// Run a closure with mutable access to the session working data.
    ///
    /// This is the single-writer path used by the workflow engine; the
    /// store lock is held for the duration of the closure.
    pub fn with_session_data<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut crate::context::ContextMap) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.last_activity_ms = self.clock.epoch_ms();
        Ok(f(&mut session.data))
    }

    pub fn set_status(&self, id: &SessionId, status: SessionStatus) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.status = status;
        session.last_activity_ms = self.clock.epoch_ms();
        Ok(())
    }

    /// Append a step trace to a workflow session's history.
    pub fn record_step(&self, id: &SessionId, step_id: &str, summary: &str) {
        let now = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        if let Some(info) = sessions.get_mut(id).and_then(Session::workflow_mut) {
            info.step_history.push(StepTrace {
                step_id: step_id.to_string(),
                summary: summary.to_string(),
                timestamp_ms: now,
            });
        }
    }

    /// Update the current step pointer of a workflow session.
    pub fn set_current_step(&self, id: &SessionId, step: Option<&str>) {
        let mut sessions = self.sessions.lock();
        if let Some(info) = sessions.get_mut(id).and_then(Session::workflow_mut) {
            info.current_step = step.map(str::to_string);
        }
    }

    /// Bump a session's activity timestamp.
    pub fn touch(&self, id: &SessionId) {
        let now = self.clock.epoch_ms();
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.last_activity_ms = now;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
