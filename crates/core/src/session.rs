// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session model: chatting and workflow sessions share a lifecycle; the
//! workflow variant carries its step history and current step.

use crate::context::ContextMap;
use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Executing,
    Waiting,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    /// A session is active while it can still take part in a cycle.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ready | Self::Executing | Self::Waiting)
    }

    /// Terminal statuses are the only valid finalization targets.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

crate::simple_display! {
    SessionStatus {
        Ready => "ready",
        Executing => "executing",
        Waiting => "waiting",
        Completed => "completed",
        Cancelled => "cancelled",
        Failed => "failed",
    }
}

/// One executed step, as remembered on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTrace {
    pub step_id: String,
    pub summary: String,
    pub timestamp_ms: u64,
}

/// Workflow-specific session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub workflow_type: String,
    /// The user command that started the workflow (kept for status queries).
    pub command: String,
    #[serde(default)]
    pub step_history: Vec<StepTrace>,
    #[serde(default)]
    pub current_step: Option<String>,
}

/// What a session is for. Workflow sessions carry their own record; this
/// replaces mode strings with a tagged variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    Chatting,
    Workflow(WorkflowInfo),
}

impl SessionKind {
    pub fn is_workflow(&self) -> bool {
        matches!(self, Self::Workflow(_))
    }
}

/// A live session. Exclusively owned by the [`crate::SessionStore`];
/// lookups hand out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
    /// Per-session working data (the session-scoped context).
    #[serde(default)]
    pub data: ContextMap,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Finalize me at the next cycle boundary.
    #[serde(default)]
    pub pending_end: bool,
    #[serde(default)]
    pub pending_end_reason: Option<String>,
    /// Terminal status to apply when the pending end is honored.
    #[serde(default)]
    pub pending_final_status: Option<SessionStatus>,
}

impl Session {
    pub fn new(kind: SessionKind, now_ms: u64) -> Self {
        Self {
            id: SessionId::new(),
            kind,
            status: SessionStatus::Ready,
            created_at_ms: now_ms,
            last_activity_ms: now_ms,
            data: ContextMap::new(),
            metadata: Map::new(),
            pending_end: false,
            pending_end_reason: None,
            pending_final_status: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Workflow info, when this is a workflow session.
    pub fn workflow(&self) -> Option<&WorkflowInfo> {
        match &self.kind {
            SessionKind::Workflow(info) => Some(info),
            SessionKind::Chatting => None,
        }
    }

    pub fn workflow_mut(&mut self) -> Option<&mut WorkflowInfo> {
        match &mut self.kind {
            SessionKind::Workflow(info) => Some(info),
            SessionKind::Chatting => None,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
