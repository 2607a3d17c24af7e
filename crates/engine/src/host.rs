// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime's implementation of the step-facing host seam.
//!
//! Reminders land in storage, monitors go through the pool (reconstructed
//! via the registered factory), interventions append to the log, and
//! named actions dispatch through a handler registry that host modules
//! populate at startup.

use crate::monitor::{MonitorFactory, MonitorPool};
use aria_core::{event_data, Clock, EventBus, EventKind, TaskId};
use aria_store::Store;
use aria_workflow::{HostActions, HostError, InterventionAction};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Handler for a named host action.
pub type ActionFn = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync>;

pub struct RuntimeHost {
    store: Store,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    monitors: Arc<MonitorPool>,
    factory: Mutex<Option<Arc<MonitorFactory>>>,
    actions: Mutex<HashMap<String, ActionFn>>,
}

impl RuntimeHost {
    pub fn new(
        store: Store,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        monitors: Arc<MonitorPool>,
    ) -> Arc<Self> {
        let host = Arc::new(Self {
            store,
            bus: Arc::clone(&bus),
            clock,
            monitors,
            factory: Mutex::new(None),
            actions: Mutex::new(HashMap::new()),
        });

        // Media control is core-adjacent: the action publishes the fact,
        // the media module does the work.
        let media_bus = bus;
        host.register_action("media_control", move |params| {
            media_bus.publish(
                EventKind::MediaControlExecuted,
                event_data! { "params" => Value::Object(params.clone()) },
                "host",
            );
            Ok(Value::Object(params.clone()))
        });
        host
    }

    /// Register the factory used to build monitor bodies by workflow type.
    pub fn set_monitor_factory(&self, factory: Arc<MonitorFactory>) {
        *self.factory.lock() = Some(factory);
    }

    /// Register a handler for a named host action.
    pub fn register_action(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    ) {
        self.actions.lock().insert(name.into(), Arc::new(handler));
    }

    pub fn registered_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl HostActions for RuntimeHost {
    fn schedule_reminder(&self, fire_at_ms: u64, message: &str) -> Result<i64, HostError> {
        self.store
            .add_reminder(fire_at_ms, message)
            .map_err(|e| HostError::Persistence(e.to_string()))
    }

    fn create_monitor(
        &self,
        workflow_type: &str,
        mut metadata: Map<String, Value>,
        check_interval: Duration,
    ) -> Result<TaskId, HostError> {
        let factory = self.factory.lock().clone();
        let Some(factory) = factory else {
            return Err(HostError::Action(format!(
                "no monitor factory registered (workflow type `{workflow_type}`)"
            )));
        };
        metadata.insert(
            "check_interval_secs".to_string(),
            Value::from(check_interval.as_secs()),
        );
        let metadata = Value::Object(metadata);
        let Some(monitor_fn) = factory(workflow_type, &metadata) else {
            return Err(HostError::Action(format!(
                "monitor factory does not recognize workflow type `{workflow_type}`"
            )));
        };

        let task_id = TaskId::new();
        self.monitors
            .submit(task_id.as_str(), workflow_type, &metadata, check_interval, monitor_fn)
            .map_err(|e| HostError::Action(e.to_string()))?;
        Ok(task_id)
    }

    fn record_intervention(
        &self,
        task_id: &str,
        action: InterventionAction,
        parameters: Map<String, Value>,
    ) -> Result<(), HostError> {
        self.store
            .add_intervention(
                task_id,
                &action.to_string(),
                &Value::Object(parameters),
                "llm",
                "recorded",
                self.clock.epoch_ms(),
            )
            .map(|_| ())
            .map_err(|e| HostError::Persistence(e.to_string()))
    }

    fn perform(&self, action: &str, params: &Map<String, Value>) -> Result<Value, HostError> {
        let handler = self.actions.lock().get(action).cloned();
        let Some(handler) = handler else {
            return Err(HostError::UnknownAction(action.to_string()));
        };
        handler(params).map_err(HostError::Action)
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
