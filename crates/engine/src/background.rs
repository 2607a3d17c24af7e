// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background workflow executor: a bounded pool for finite auto-run
//! workflows.
//!
//! Workers drive an engine with empty input up to a hard iteration cap.
//! Interactive workflows are refused at submit time. Cancellation is
//! cooperative: the flag flips, the running iteration completes.

use crate::error::RuntimeError;
use aria_core::{event_data, Clock, EventBus, EventKind, SessionId, TaskId};
use aria_store::{BackgroundStatus, Store};
use aria_workflow::WorkflowEngine;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Workers in the pool.
pub const BACKGROUND_POOL_SIZE: usize = 5;

/// Hard cap on engine iterations per task, preventing infinite loops.
pub const MAX_ITERATIONS: usize = 100;

/// Bounded join per worker on shutdown.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Job {
    task_id: TaskId,
    workflow_type: String,
    session_id: Option<SessionId>,
    engine: Arc<Mutex<WorkflowEngine>>,
}

/// Bounded worker pool for background workflows.
pub struct BackgroundExecutor {
    store: Store,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<Job>,
    cancelled: Arc<Mutex<HashSet<String>>>,
    token: CancellationToken,
    workers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl BackgroundExecutor {
    /// Build the executor and spawn its workers. Must run inside a tokio
    /// runtime.
    pub fn new(store: Store, bus: Arc<EventBus>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let executor = Arc::new(Self {
            store,
            bus,
            clock,
            tx,
            cancelled: Arc::new(Mutex::new(HashSet::new())),
            token: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        });

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = executor.workers.lock();
        for worker_idx in 0..BACKGROUND_POOL_SIZE {
            let executor = Arc::clone(&executor);
            let rx = Arc::clone(&rx);
            workers.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = executor.token.cancelled() => break,
                            job = rx.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };
                    executor.run_job(job, worker_idx).await;
                }
            }));
        }
        drop(workers);
        executor
    }

    /// Queue a workflow for background execution.
    ///
    /// Refused when the engine's current step needs user input or a
    /// review verdict: background workflows must be non-interactive.
    pub fn submit(
        &self,
        engine: Arc<Mutex<WorkflowEngine>>,
        workflow_type: &str,
        session_id: Option<SessionId>,
        metadata: &Value,
    ) -> Result<TaskId, RuntimeError> {
        {
            let engine = engine.lock();
            if engine.requires_input() {
                return Err(RuntimeError::Submit(
                    "workflow requires user input; background workflows must be non-interactive"
                        .to_string(),
                ));
            }
            if engine.awaiting_llm_review() {
                return Err(RuntimeError::Submit(
                    "workflow is awaiting llm review".to_string(),
                ));
            }
        }

        let task_id = TaskId::new();
        self.store.insert_background(
            task_id.as_str(),
            workflow_type,
            &Value::Object(serde_json::Map::new()),
            metadata,
            self.clock.epoch_ms(),
        )?;

        let job = Job {
            task_id,
            workflow_type: workflow_type.to_string(),
            session_id,
            engine,
        };
        self.tx
            .send(job)
            .map_err(|_| RuntimeError::Submit("executor is shut down".to_string()))?;
        tracing::info!(task_id = %task_id, workflow_type, "background workflow queued");
        Ok(task_id)
    }

    /// Cooperative cancel: the record flips once the worker notices; a
    /// running iteration completes first.
    pub fn cancel(&self, task_id: &str) {
        self.cancelled.lock().insert(task_id.to_string());
    }

    async fn run_job(&self, job: Job, worker_idx: usize) {
        let task_id = job.task_id.as_str().to_string();
        let now = self.clock.epoch_ms();
        if let Err(e) = self
            .store
            .set_background_status(&task_id, BackgroundStatus::Running, now)
        {
            tracing::error!(task_id = %task_id, error = %e, "record not set running; dropping job");
            return;
        }
        tracing::debug!(task_id = %task_id, worker = worker_idx, "background workflow running");

        let mut iterations = 0usize;
        let outcome = loop {
            if self.cancelled.lock().remove(&task_id) {
                break Outcome::Cancelled;
            }
            if iterations >= MAX_ITERATIONS {
                break Outcome::Failed(format!("iteration cap of {MAX_ITERATIONS} reached"));
            }
            iterations += 1;

            let step_outcome = {
                let mut engine = job.engine.lock();
                if engine.requires_input() {
                    break Outcome::Failed(
                        "background workflow reached an interactive step".to_string(),
                    );
                }
                if engine.awaiting_llm_review() {
                    break Outcome::Failed(
                        "background workflow hit a review gate".to_string(),
                    );
                }
                match engine.process_input(Some("")) {
                    Ok(result) => {
                        if engine.is_cancelled() {
                            Some(Outcome::Cancelled)
                        } else if engine.is_failed() {
                            Some(Outcome::Failed(result.message))
                        } else if engine.is_complete() {
                            Some(Outcome::Completed)
                        } else {
                            None
                        }
                    }
                    Err(e) => Some(Outcome::Failed(e.to_string())),
                }
            };
            self.store
                .record_check(&task_id, self.clock.epoch_ms(), None)
                .unwrap_or_else(|e| {
                    tracing::warn!(task_id = %task_id, error = %e, "check not recorded");
                });

            match step_outcome {
                Some(outcome) => break outcome,
                None => tokio::task::yield_now().await,
            }
        };

        self.finish_job(&job, &task_id, outcome);
    }

    fn finish_job(&self, job: &Job, task_id: &str, outcome: Outcome) {
        let now = self.clock.epoch_ms();
        let executed: Vec<String> = job.engine.lock().executed_steps().to_vec();
        let session_field = job
            .session_id
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();

        match outcome {
            Outcome::Completed => {
                self.set_status(task_id, BackgroundStatus::Completed, now);
                tracing::info!(task_id, steps = executed.len(), "background workflow completed");
                self.bus.publish(
                    EventKind::BackgroundWorkflowCompleted,
                    event_data! {
                        "task_id" => task_id,
                        "workflow_type" => job.workflow_type.as_str(),
                        "session_id" => session_field,
                        "completed_steps" => executed,
                    },
                    "background_executor",
                );
            }
            Outcome::Failed(error) => {
                self.set_status(task_id, BackgroundStatus::Failed, now);
                if let Err(e) = self.store.set_background_error(task_id, &error, now) {
                    tracing::warn!(task_id, error = %e, "error message not persisted");
                }
                tracing::warn!(task_id, error = %error, "background workflow failed");
                self.bus.publish(
                    EventKind::BackgroundWorkflowFailed,
                    event_data! {
                        "task_id" => task_id,
                        "workflow_type" => job.workflow_type.as_str(),
                        "session_id" => session_field,
                        "error" => error,
                    },
                    "background_executor",
                );
            }
            Outcome::Cancelled => {
                self.set_status(task_id, BackgroundStatus::Cancelled, now);
                tracing::info!(task_id, "background workflow cancelled");
                self.bus.publish(
                    EventKind::BackgroundWorkflowCancelled,
                    event_data! {
                        "task_id" => task_id,
                        "workflow_type" => job.workflow_type.as_str(),
                        "session_id" => session_field,
                        "completed_steps" => executed,
                    },
                    "background_executor",
                );
            }
        }
    }

    fn set_status(&self, task_id: &str, status: BackgroundStatus, now: u64) {
        if let Err(e) = self.store.set_background_status(task_id, status, now) {
            tracing::error!(task_id, %status, error = %e, "status transition not persisted");
        }
    }

    /// Signal the workers and join each within a bound. Queued jobs that
    /// never started remain `Queued` in storage.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, worker).await.is_err() {
                tracing::warn!("background worker did not stop within {:?}", SHUTDOWN_JOIN_TIMEOUT);
            }
        }
    }
}

enum Outcome {
    Completed,
    Failed(String),
    Cancelled,
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
