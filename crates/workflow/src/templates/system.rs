// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System steps: host side effects routed through [`crate::HostActions`].

use crate::host::InterventionAction;
use crate::result::StepResult;
use crate::step::{Step, StepContext, StepType};
use aria_core::ContextMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Generic host action step: `perform(action, params)` with parameters
/// resolved from literals plus named session-data keys.
pub struct SystemActionStep {
    id: String,
    description: String,
    action: String,
    params: Map<String, Value>,
    /// Session-data keys copied into the params at execution time.
    param_keys: Vec<String>,
    /// Session-data key the action result is stored under, when wanted.
    result_key: Option<String>,
}

impl SystemActionStep {
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            action: action.into(),
            params: Map::new(),
            param_keys: Vec::new(),
            result_key: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Copy a session-data key into the action params at execution time.
    pub fn param_from_data(mut self, key: impl Into<String>) -> Self {
        self.param_keys.push(key.into());
        self
    }

    pub fn result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for SystemActionStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("executing: {}", self.action)
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let mut params = self.params.clone();
        for key in &self.param_keys {
            params.insert(key.clone(), ctx.data.get_or(key, Value::Null));
        }

        match ctx.host.perform(&self.action, &params) {
            Ok(value) => {
                let mut result = StepResult::success(format!("{} done", self.action));
                if let Some(key) = &self.result_key {
                    ctx.data.set(key.clone(), value.clone());
                    result = result.with_entry(key.clone(), value);
                }
                result
            }
            Err(e) => StepResult::failure(format!("{} failed: {e}", self.action)),
        }
    }
}

/// Registers a named condition check to run on an interval.
///
/// The check itself lives host-side; this step only creates the monitoring
/// task that will run it.
pub struct PeriodicCheckStep {
    inner: MonitorCreationStep,
}

impl PeriodicCheckStep {
    pub fn new(
        id: impl Into<String>,
        check_name: impl Into<String>,
        check_interval: Duration,
    ) -> Self {
        let check_name = check_name.into();
        Self {
            inner: MonitorCreationStep::new(id, "periodic_check")
                .metadata("check_name", check_name)
                .check_interval(check_interval),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.inner = self.inner.description(text);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner = self.inner.metadata(key, value);
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for PeriodicCheckStep {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn description(&self) -> &str {
        Step::description(&self.inner)
    }

    fn prompt(&self, data: &ContextMap) -> String {
        self.inner.prompt(data)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        self.inner.execute(input, ctx)
    }
}

/// Schedules a one-shot reminder at an absolute time.
///
/// The fire time comes from a session-data key (milliseconds since epoch)
/// and the message from a template or a data key.
pub struct ScheduledTriggerStep {
    id: String,
    description: String,
    fire_at_key: String,
    message_key: Option<String>,
    message: String,
}

impl ScheduledTriggerStep {
    pub fn new(id: impl Into<String>, fire_at_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            fire_at_key: fire_at_key.into(),
            message_key: None,
            message: String::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message = text.into();
        self
    }

    /// Read the reminder message from session data instead of a literal.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for ScheduledTriggerStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        "scheduling reminder".to_string()
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let Some(fire_at_ms) = ctx.data.get(&self.fire_at_key).and_then(Value::as_u64) else {
            return StepResult::failure(format!(
                "missing or invalid fire time under `{}`",
                self.fire_at_key
            ));
        };
        let message = match &self.message_key {
            Some(key) => ctx
                .data
                .get_str(key)
                .map(str::to_string)
                .unwrap_or_else(|| self.message.clone()),
            None => self.message.clone(),
        };

        match ctx.host.schedule_reminder(fire_at_ms, &message) {
            Ok(reminder_id) => StepResult::success(format!("reminder #{reminder_id} scheduled"))
                .with_entry("reminder_id", reminder_id),
            Err(e) => StepResult::failure(format!("failed to schedule reminder: {e}")),
        }
    }
}

/// Creates a persistent monitoring task for a workflow type.
pub struct MonitorCreationStep {
    id: String,
    description: String,
    workflow_type: String,
    metadata: Map<String, Value>,
    /// Session-data keys copied into the monitor metadata.
    metadata_keys: Vec<String>,
    check_interval: Duration,
}

impl MonitorCreationStep {
    pub fn new(id: impl Into<String>, workflow_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            workflow_type: workflow_type.into(),
            metadata: Map::new(),
            metadata_keys: Vec::new(),
            check_interval: Duration::from_secs(60),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_from_data(mut self, key: impl Into<String>) -> Self {
        self.metadata_keys.push(key.into());
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for MonitorCreationStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("creating monitor for {}", self.workflow_type)
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let mut metadata = self.metadata.clone();
        for key in &self.metadata_keys {
            metadata.insert(key.clone(), ctx.data.get_or(key, Value::Null));
        }

        match ctx
            .host
            .create_monitor(&self.workflow_type, metadata, self.check_interval)
        {
            Ok(task_id) => {
                ctx.data.set("monitor_task_id", task_id.as_str());
                StepResult::success(format!("monitor {task_id} created"))
                    .with_entry("monitor_task_id", task_id.as_str())
            }
            Err(e) => StepResult::failure(format!("failed to create monitor: {e}")),
        }
    }
}

/// Records an intervention against a background task.
pub struct InterventionStep {
    id: String,
    description: String,
    action: InterventionAction,
    /// Session-data key holding the target task id.
    task_id_key: String,
    parameters: Map<String, Value>,
}

impl InterventionStep {
    pub fn new(
        id: impl Into<String>,
        action: InterventionAction,
        task_id_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            action,
            task_id_key: task_id_key.into(),
            parameters: Map::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn arc(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl Step for InterventionStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        format!("intervention: {}", self.action)
    }

    fn execute(&self, _input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult {
        let Some(task_id) = ctx.data.get_str(&self.task_id_key).map(str::to_string) else {
            return StepResult::failure(format!(
                "missing task id under `{}`",
                self.task_id_key
            ));
        };

        match ctx
            .host
            .record_intervention(&task_id, self.action, self.parameters.clone())
        {
            Ok(()) => StepResult::success(format!("{} recorded for {task_id}", self.action)),
            Err(e) => StepResult::failure(format!("intervention failed: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
