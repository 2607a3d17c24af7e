// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seam between steps and the host runtime.
//!
//! Steps never touch storage or pools directly; system-flavored templates
//! go through this trait, which the engine crate implements against the
//! real store and monitor pool.

use aria_core::TaskId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Actions recorded against a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionAction {
    Edit,
    Cancel,
    Pause,
    Resume,
}

aria_core::simple_display! {
    InterventionAction {
        Edit => "edit",
        Cancel => "cancel",
        Pause => "pause",
        Resume => "resume",
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action failed: {0}")]
    Action(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("background submit error: {0}")]
    Submit(String),
}

/// Host side effects available to steps.
pub trait HostActions: Send + Sync {
    /// Schedule a one-shot reminder; returns the persisted reminder id.
    fn schedule_reminder(&self, fire_at_ms: u64, message: &str) -> Result<i64, HostError>;

    /// Create a persistent monitoring task for a workflow type.
    fn create_monitor(
        &self,
        workflow_type: &str,
        metadata: Map<String, Value>,
        check_interval: Duration,
    ) -> Result<TaskId, HostError>;

    /// Append an intervention record for a background task.
    fn record_intervention(
        &self,
        task_id: &str,
        action: InterventionAction,
        parameters: Map<String, Value>,
    ) -> Result<(), HostError>;

    /// Perform a named host-side action (file read, media control, ...).
    fn perform(&self, action: &str, params: &Map<String, Value>) -> Result<Value, HostError>;
}

/// Call log entry kept by [`NoopHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Reminder { fire_at_ms: u64, message: String },
    Monitor { workflow_type: String },
    Intervention { task_id: String, action: InterventionAction },
    Perform { action: String },
}

/// Test double: accepts everything and records the calls.
#[derive(Default)]
pub struct NoopHost {
    calls: Mutex<Vec<HostCall>>,
}

impl NoopHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }
}

impl HostActions for NoopHost {
    fn schedule_reminder(&self, fire_at_ms: u64, message: &str) -> Result<i64, HostError> {
        self.calls.lock().push(HostCall::Reminder {
            fire_at_ms,
            message: message.to_string(),
        });
        Ok(1)
    }

    fn create_monitor(
        &self,
        workflow_type: &str,
        _metadata: Map<String, Value>,
        _check_interval: Duration,
    ) -> Result<TaskId, HostError> {
        self.calls.lock().push(HostCall::Monitor {
            workflow_type: workflow_type.to_string(),
        });
        Ok(TaskId::new())
    }

    fn record_intervention(
        &self,
        task_id: &str,
        action: InterventionAction,
        _parameters: Map<String, Value>,
    ) -> Result<(), HostError> {
        self.calls.lock().push(HostCall::Intervention {
            task_id: task_id.to_string(),
            action,
        });
        Ok(())
    }

    fn perform(&self, action: &str, _params: &Map<String, Value>) -> Result<Value, HostError> {
        self.calls.lock().push(HostCall::Perform {
            action: action.to_string(),
        });
        Ok(Value::Null)
    }
}
