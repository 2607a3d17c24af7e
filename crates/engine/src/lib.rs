// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aria-engine: the orchestration runtime — background executor, monitor
//! pool, scheduled-event driver, controller, state manager, and the root
//! [`Runtime`] object that wires them together.
//!
//! There are no global singletons: everything hangs off a `Runtime` built
//! per process (and per test).

pub mod background;
pub mod builtin;
pub mod controller;
pub mod error;
pub mod host;
pub mod monitor;
pub mod request;
pub mod scheduler;
pub mod state;

pub use background::{BackgroundExecutor, BACKGROUND_POOL_SIZE, MAX_ITERATIONS};
pub use builtin::register_builtin_workflows;
pub use controller::{Controller, TaskEntry};
pub use error::RuntimeError;
pub use host::RuntimeHost;
pub use monitor::{
    interval_monitor, MonitorFactory, MonitorFn, MonitorPool, RestoreReport, ShutdownReport,
};
pub use request::{Request, Response};
pub use scheduler::{ScheduledEventDriver, DEFAULT_TICK};
pub use state::StateManager;

use aria_core::{
    Clock, EventBus, EventKind, Handler, SessionId, SessionStatus, SessionStore, SystemClock,
    SystemState, WorkingContext,
};
use aria_store::Store;
use aria_workflow::{HostActions, ReviewAction, WorkflowEngine, WorkflowMode, WorkflowRegistry};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Live engines, one per active workflow session.
pub type EngineMap = Arc<Mutex<HashMap<SessionId, Arc<Mutex<WorkflowEngine>>>>>;

/// Filesystem layout and tuning for one runtime instance.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Root state directory (db, sidecars, snapshots).
    pub state_dir: PathBuf,
    /// Scheduled-event driver poll interval.
    pub scheduler_tick: Duration,
}

impl RuntimeConfig {
    /// User-level defaults under the platform state directory.
    pub fn load() -> Self {
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            state_dir: base.join("aria"),
            scheduler_tick: DEFAULT_TICK,
        }
    }

    /// Rooted at an explicit directory (tests use a tempdir).
    pub fn at(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            scheduler_tick: DEFAULT_TICK,
        }
    }

    pub fn scheduler_tick(mut self, tick: Duration) -> Self {
        self.scheduler_tick = tick;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.state_dir.join("aria.db")
    }

    pub fn sleep_sidecar_path(&self) -> PathBuf {
        self.state_dir.join("sleep_context.json")
    }

    pub fn task_snapshot_path(&self) -> PathBuf {
        self.state_dir.join("tasks.json")
    }
}

/// The root object: owns the bus, stores, pools, and loops.
pub struct Runtime {
    config: RuntimeConfig,
    clock: Arc<dyn Clock>,
    bus: Arc<EventBus>,
    sessions: Arc<SessionStore>,
    context: Arc<WorkingContext>,
    store: Store,
    registry: Arc<WorkflowRegistry>,
    engines: EngineMap,
    host: Arc<RuntimeHost>,
    background: Arc<BackgroundExecutor>,
    monitors: Arc<MonitorPool>,
    scheduler: Arc<ScheduledEventDriver>,
    controller: Controller,
    state: Arc<StateManager>,
}

impl Runtime {
    /// Build a runtime on the system clock. Must run inside a tokio
    /// runtime (worker pools spawn at construction).
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build with an explicit clock (tests drive time).
    pub fn with_clock(config: RuntimeConfig, clock: Arc<dyn Clock>) -> Result<Self, RuntimeError> {
        std::fs::create_dir_all(&config.state_dir)
            .map_err(|e| RuntimeError::InvalidInput(format!("state dir: {e}")))?;

        let bus = EventBus::new(Arc::clone(&clock));
        let sessions = SessionStore::new(Arc::clone(&clock));
        let store = Store::open(&config.db_path())?;
        let registry = Arc::new(WorkflowRegistry::new());
        register_builtin_workflows(&registry);

        let engines: EngineMap = Arc::new(Mutex::new(HashMap::new()));
        let monitors = MonitorPool::new(store.clone(), Arc::clone(&clock));
        let host = RuntimeHost::new(
            store.clone(),
            Arc::clone(&bus),
            Arc::clone(&clock),
            Arc::clone(&monitors),
        );
        let background = BackgroundExecutor::new(store.clone(), Arc::clone(&bus), Arc::clone(&clock));
        let scheduler = ScheduledEventDriver::new(
            store.clone(),
            Arc::clone(&bus),
            Arc::clone(&clock),
            config.scheduler_tick,
        );
        let controller = Controller::new(
            Arc::clone(&bus),
            Arc::clone(&sessions),
            Arc::clone(&engines),
            config.task_snapshot_path(),
        );
        let state = Arc::new(StateManager::new(
            Arc::clone(&bus),
            Arc::clone(&clock),
            config.sleep_sidecar_path(),
        ));

        Ok(Self {
            config,
            clock,
            bus,
            sessions,
            context: Arc::new(WorkingContext::new()),
            store,
            registry,
            engines,
            host,
            background,
            monitors,
            scheduler,
            controller,
            state,
        })
    }

    /// Start the loops: bus delivery, controller subscriptions, registry
    /// snapshot, startup report, scheduler tick.
    pub fn start(&self) {
        self.bus.start();
        self.controller.attach();
        self.attach_state_tracking();
        self.controller.load_snapshot();
        self.scheduler.publish_startup_report();
        self.scheduler.start();
        tracing::info!(state_dir = %self.config.state_dir.display(), "runtime started");
    }

    /// Keep the coarse system state in step with workflow sessions.
    fn attach_state_tracking(&self) {
        let sessions = Arc::clone(&self.sessions);
        let state = Arc::clone(&self.state);
        self.bus.subscribe(
            EventKind::SessionEnded,
            Arc::new(move |_event: &aria_core::Event| {
                if state.current() == SystemState::Work
                    && sessions.active_workflow_session().is_none()
                {
                    if let Err(e) = state.transition(SystemState::Idle, "workflow ended") {
                        tracing::debug!(error = %e, "state not returned to idle");
                    }
                }
                Ok(())
            }) as Handler,
            "runtime.state",
        );
    }

    /// Restore suspended monitors through a factory, remembering it for
    /// monitors created later by workflow steps.
    pub fn restore_monitors(&self, factory: Arc<MonitorFactory>) -> Result<RestoreReport, RuntimeError> {
        self.host.set_monitor_factory(Arc::clone(&factory));
        self.monitors.restore(&*factory)
    }

    /// Load declarative workflow definitions: one catalogue file plus a
    /// step-graph file per workflow under `graphs_dir`. Definitions are
    /// validated here; returns how many were registered.
    pub fn load_workflow_definitions(
        &self,
        catalogue_path: &std::path::Path,
        graphs_dir: &std::path::Path,
    ) -> Result<usize, RuntimeError> {
        use aria_workflow::config;

        let catalogue = config::load_catalogue(catalogue_path)?;
        let mut loaded = 0;
        let entries = std::fs::read_dir(graphs_dir)
            .map_err(|e| RuntimeError::InvalidInput(format!("graphs dir: {e}")))?;
        for dir_entry in entries {
            let path = dir_entry
                .map_err(|e| RuntimeError::InvalidInput(format!("graphs dir: {e}")))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let graph = config::load_graph(&path)?;
            let Some(entry) = catalogue.workflows.get(&graph.workflow_type) else {
                tracing::warn!(
                    workflow_type = %graph.workflow_type,
                    path = %path.display(),
                    "step graph has no catalogue entry; skipped"
                );
                continue;
            };
            // Validate once at load; engines get cheap clones (steps are
            // stateless, all per-run state lives in session data).
            let definition = config::build_definition(&graph.workflow_type, entry, &graph)?;
            self.registry.register_catalogue(
                graph.workflow_type.clone(),
                entry.clone(),
                move || definition.clone(),
            );
            loaded += 1;
        }
        tracing::info!(loaded, "workflow definitions loaded");
        Ok(loaded)
    }

    /// Graceful shutdown: stop the ticker, suspend monitors, drain the
    /// background pool, persist the registry, stop the bus.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.scheduler.stop().await;
        let report = self.monitors.prepare_shutdown().await;
        self.background.shutdown().await;
        self.controller.save_snapshot();
        self.bus.stop().await;
        tracing::info!(
            suspended = report.suspended.len(),
            "runtime shut down"
        );
        report
    }

    /// Handle one tool call.
    pub fn handle(&self, request: Request) -> Result<Response, RuntimeError> {
        match request {
            Request::StartWorkflow { workflow_type, command, initial_data } => {
                self.start_workflow(&workflow_type, &command, initial_data)
            }
            Request::ContinueWorkflow { session_id, user_input } => {
                self.continue_workflow(&session_id, &user_input)
            }
            Request::CancelWorkflow { session_id, reason } => {
                self.cancel_workflow(&session_id, reason.as_deref().unwrap_or("cancelled by user"))
            }
            Request::ApproveStep { session_id } => {
                self.review_step(&session_id, ReviewAction::Approve)
            }
            Request::ModifyStep { session_id, modified_params } => self.review_step(
                &session_id,
                ReviewAction::Modify(modified_params),
            ),
            Request::CancelStep { session_id } => {
                self.review_step(&session_id, ReviewAction::Cancel)
            }
            Request::EndWorkflowSession { session_id, reason } => {
                let id = SessionId::from_string(&session_id);
                self.sessions.mark_for_end(
                    &id,
                    reason.unwrap_or_else(|| "ended by llm".to_string()),
                    SessionStatus::Completed,
                )?;
                Ok(Response::Ack {
                    status: "pending_end".to_string(),
                    message: "session will end at the next cycle boundary".to_string(),
                })
            }
            Request::GetWorkflowStatus { session_id } => {
                let id = SessionId::from_string(&session_id);
                let engine = self.engine_for(&id)?;
                let status = engine.lock().status();
                let status = serde_json::to_value(status)
                    .map_err(|e| RuntimeError::InvalidInput(e.to_string()))?;
                Ok(Response::Status { status })
            }
        }
    }

    fn start_workflow(
        &self,
        workflow_type: &str,
        command: &str,
        initial_data: Map<String, Value>,
    ) -> Result<Response, RuntimeError> {
        if !self.registry.contains(workflow_type) {
            return Err(RuntimeError::WorkflowNotFound(workflow_type.to_string()));
        }
        let definition = self.registry.build(workflow_type)?;
        let seeded = self.registry.initial_data(workflow_type, &initial_data);

        let session_id = self
            .sessions
            .create_workflow_session(&self.bus, workflow_type, command)?;
        self.sessions.with_session_data(&session_id, |data| {
            data.merge(&seeded);
        })?;

        let mode = definition.mode;
        let engine = WorkflowEngine::new(
            Arc::clone(&definition),
            session_id,
            Arc::clone(&self.sessions),
            Arc::clone(&self.bus),
            Arc::clone(&self.host) as Arc<dyn HostActions>,
        );
        let engine = Arc::new(Mutex::new(engine));
        self.engines.lock().insert(session_id, Arc::clone(&engine));

        if self.state.current() == SystemState::Idle {
            if let Err(e) = self.state.transition(SystemState::Work, "workflow started") {
                tracing::debug!(error = %e, "state not moved to work");
            }
        }

        if mode == WorkflowMode::Background {
            let task_id = self
                .background
                .submit(
                    Arc::clone(&engine),
                    workflow_type,
                    Some(session_id),
                    &Value::Object(Map::new()),
                )
                .map_err(|e| {
                    // The session never ran; tear it down immediately.
                    self.engines.lock().remove(&session_id);
                    let _ = self.sessions.end_session(
                        &self.bus,
                        &session_id,
                        "background submit failed",
                        SessionStatus::Failed,
                    );
                    e
                })?;
            self.controller.register_task(TaskEntry {
                task_id: task_id.as_str().to_string(),
                workflow_type: workflow_type.to_string(),
                session_id: Some(session_id.as_str().to_string()),
                status: "queued".to_string(),
                started_at_ms: self.clock.epoch_ms(),
            });
            self.sessions.mark_for_end(
                &session_id,
                "background workflow submitted",
                SessionStatus::Completed,
            )?;
            return Ok(Response::Started {
                session_id: session_id.to_string(),
                requires_input: false,
                current_step_prompt: None,
                workflow_steps_overview: definition.overview(),
                auto_continue: true,
                task_id: Some(task_id.as_str().to_string()),
            });
        }

        let result = engine.lock().start()?;
        let (requires_input, prompt, complete, failed, cancelled) = {
            let engine = engine.lock();
            (
                engine.requires_input(),
                engine.prompt(),
                engine.is_complete(),
                engine.is_failed(),
                engine.is_cancelled(),
            )
        };

        if failed {
            self.sessions
                .mark_for_end(&session_id, result.message.clone(), SessionStatus::Failed)?;
        } else if cancelled {
            self.sessions
                .mark_for_end(&session_id, result.message.clone(), SessionStatus::Cancelled)?;
        } else if complete {
            self.sessions
                .mark_for_end(&session_id, result.message.clone(), SessionStatus::Completed)?;
        }

        Ok(Response::Started {
            session_id: session_id.to_string(),
            requires_input,
            current_step_prompt: if requires_input { prompt } else { None },
            workflow_steps_overview: definition.overview(),
            auto_continue: !requires_input && !complete,
            task_id: None,
        })
    }

    fn continue_workflow(&self, session_id: &str, user_input: &str) -> Result<Response, RuntimeError> {
        let id = SessionId::from_string(session_id);
        let session = self
            .sessions
            .get(&id)
            .ok_or_else(|| RuntimeError::SessionNotActive(session_id.to_string()))?;
        if !session.is_active() {
            return Err(RuntimeError::SessionNotActive(session_id.to_string()));
        }
        let engine = self.engine_for(&id)?;

        let result = engine.lock().process_input(Some(user_input))?;
        self.settle_session(&id, &engine, &result.message);

        let (status, requires_input, prompt, review) = {
            let engine = engine.lock();
            (
                engine_status_label(&engine),
                engine.requires_input(),
                if engine.requires_input() { engine.prompt() } else { None },
                engine.pending_review_data(),
            )
        };
        Ok(Response::Continued {
            status,
            requires_input,
            prompt,
            data: result.data,
            llm_review_data: review,
        })
    }

    fn cancel_workflow(&self, session_id: &str, reason: &str) -> Result<Response, RuntimeError> {
        let id = SessionId::from_string(session_id);
        let engine = self.engine_for(&id)?;
        engine.lock().cancel(reason);
        self.sessions
            .mark_for_end(&id, reason, SessionStatus::Cancelled)?;
        Ok(Response::Cancelled {
            status: "cancelled".to_string(),
            message: reason.to_string(),
        })
    }

    fn review_step(
        &self,
        session_id: &str,
        action: ReviewAction,
    ) -> Result<Response, RuntimeError> {
        let id = SessionId::from_string(session_id);
        let engine = self.engine_for(&id)?;
        let cancelled = matches!(action, ReviewAction::Cancel);

        let result = engine.lock().handle_review(action)?;
        if cancelled {
            self.sessions
                .mark_for_end(&id, result.message.clone(), SessionStatus::Cancelled)?;
        } else {
            self.settle_session(&id, &engine, &result.message);
        }

        let (status, requires_input, prompt, review) = {
            let engine = engine.lock();
            (
                engine_status_label(&engine),
                engine.requires_input(),
                if engine.requires_input() { engine.prompt() } else { None },
                engine.pending_review_data(),
            )
        };
        Ok(Response::Continued {
            status,
            requires_input,
            prompt,
            data: result.data,
            llm_review_data: review,
        })
    }

    /// Mark the session pending-end when the engine reached a terminal
    /// state. Failure always defers teardown so the LLM narrates first.
    fn settle_session(&self, id: &SessionId, engine: &Arc<Mutex<WorkflowEngine>>, message: &str) {
        let (failed, cancelled, complete) = {
            let engine = engine.lock();
            (engine.is_failed(), engine.is_cancelled(), engine.is_complete())
        };
        let outcome = if failed {
            Some((SessionStatus::Failed, message.to_string()))
        } else if cancelled {
            Some((SessionStatus::Cancelled, message.to_string()))
        } else if complete {
            Some((SessionStatus::Completed, "workflow complete".to_string()))
        } else {
            None
        };
        if let Some((status, reason)) = outcome {
            if let Err(e) = self.sessions.mark_for_end(id, reason, status) {
                tracing::debug!(session_id = %id, error = %e, "session already settling");
            }
        }
    }

    fn engine_for(&self, id: &SessionId) -> Result<Arc<Mutex<WorkflowEngine>>, RuntimeError> {
        self.engines
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::EngineNotFound(id.to_string()))
    }

    // Component accessors: tests and host modules reach everything
    // through the root object.

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn context(&self) -> &Arc<WorkingContext> {
        &self.context
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn host(&self) -> &Arc<RuntimeHost> {
        &self.host
    }

    pub fn background(&self) -> &Arc<BackgroundExecutor> {
        &self.background
    }

    pub fn monitors(&self) -> &Arc<MonitorPool> {
        &self.monitors
    }

    pub fn scheduler(&self) -> &Arc<ScheduledEventDriver> {
        &self.scheduler
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }
}

fn engine_status_label(engine: &WorkflowEngine) -> String {
    if engine.is_cancelled() {
        "cancelled"
    } else if engine.is_failed() {
        "failed"
    } else if engine.is_complete() {
        "completed"
    } else if engine.awaiting_llm_review() {
        "awaiting_review"
    } else if engine.requires_input() {
        "requires_input"
    } else {
        "in_progress"
    }
    .to_string()
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
