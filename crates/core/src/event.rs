// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model: the closed kind enumeration and the published envelope.

use crate::clock::Clock;
use crate::id::EventId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed enumeration of everything the runtime publishes.
///
/// Wire values are lowercase snake_case and stable; modules match on them
/// when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // -- layer completions --
    InputLayerComplete,
    ProcessingLayerComplete,
    OutputLayerComplete,

    // -- module lifecycle --
    ModuleInitialized,
    ModuleReady,
    ModuleError,
    ModuleBusy,

    // -- system state --
    StateChanged,
    SessionStarted,
    SessionEnded,

    // -- cycle control --
    CycleStarted,
    CycleCompleted,

    // -- workflows --
    WorkflowStepCompleted,
    WorkflowRequiresInput,
    WorkflowFailed,
    BackgroundWorkflowCompleted,
    BackgroundWorkflowFailed,
    BackgroundWorkflowCancelled,

    // -- scheduled triggers --
    ReminderTriggered,
    CalendarEventStarting,
    TodoUpcoming,
    TodoOverdue,
    SystemStartupReport,

    // -- host actions --
    MediaControlExecuted,

    // -- sleep --
    SleepEntered,
    SleepExited,
}

crate::simple_display! {
    EventKind {
        InputLayerComplete => "input_layer_complete",
        ProcessingLayerComplete => "processing_layer_complete",
        OutputLayerComplete => "output_layer_complete",
        ModuleInitialized => "module_initialized",
        ModuleReady => "module_ready",
        ModuleError => "module_error",
        ModuleBusy => "module_busy",
        StateChanged => "state_changed",
        SessionStarted => "session_started",
        SessionEnded => "session_ended",
        CycleStarted => "cycle_started",
        CycleCompleted => "cycle_completed",
        WorkflowStepCompleted => "workflow_step_completed",
        WorkflowRequiresInput => "workflow_requires_input",
        WorkflowFailed => "workflow_failed",
        BackgroundWorkflowCompleted => "background_workflow_completed",
        BackgroundWorkflowFailed => "background_workflow_failed",
        BackgroundWorkflowCancelled => "background_workflow_cancelled",
        ReminderTriggered => "reminder_triggered",
        CalendarEventStarting => "calendar_event_starting",
        TodoUpcoming => "todo_upcoming",
        TodoOverdue => "todo_overdue",
        SystemStartupReport => "system_startup_report",
        MediaControlExecuted => "media_control_executed",
        SleepEntered => "sleep_entered",
        SleepExited => "sleep_exited",
    }
}

/// A published event. Immutable after publish; subscribers receive a
/// shared reference and the history keeps a clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub data: Map<String, Value>,
    pub source: String,
    pub timestamp_ms: u64,
}

impl Event {
    pub fn new(
        kind: EventKind,
        data: Map<String, Value>,
        source: impl Into<String>,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: EventId::new(),
            kind,
            data,
            source: source.into(),
            timestamp_ms: clock.epoch_ms(),
        }
    }

    /// Fetch a string field from the event data.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Fetch a boolean field from the event data.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }
}

/// Build a `serde_json::Map` from key/value pairs.
///
/// ```ignore
/// let data = aria_core::event_data! { "session_id" => id.as_str(), "complete" => true };
/// ```
#[macro_export]
macro_rules! event_data {
    ( $( $key:expr => $val:expr ),* $(,)? ) => {{
        #[allow(unused_mut)]
        let mut map = serde_json::Map::new();
        $( map.insert($key.to_string(), serde_json::Value::from($val)); )*
        map
    }};
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
