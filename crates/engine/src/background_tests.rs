// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aria_core::{EventBus, SessionStore, TestClock};
use aria_workflow::definition::{Transition, WorkflowDefinition, END};
use aria_workflow::templates::{InputStep, LoopStep, ProcessingStep};
use aria_workflow::{NoopHost, StepResult};
use serde_json::json;

struct Fixture {
    store: Store,
    bus: Arc<EventBus>,
    sessions: Arc<SessionStore>,
    executor: Arc<BackgroundExecutor>,
}

fn fixture() -> Fixture {
    let clock = TestClock::new();
    let bus = EventBus::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let sessions = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let store = Store::open_in_memory().unwrap();
    let executor = BackgroundExecutor::new(store.clone(), Arc::clone(&bus), clock);
    Fixture { store, bus, sessions, executor }
}

impl Fixture {
    fn engine(&self, def: WorkflowDefinition) -> (Arc<Mutex<WorkflowEngine>>, SessionId) {
        let session_id = self
            .sessions
            .create_workflow_session(&self.bus, def.workflow_type.clone(), "cmd")
            .unwrap();
        let engine = WorkflowEngine::new(
            Arc::new(def),
            session_id,
            Arc::clone(&self.sessions),
            Arc::clone(&self.bus),
            Arc::new(NoopHost::new()),
        );
        (Arc::new(Mutex::new(engine)), session_id)
    }

    async fn wait_for_status(&self, task_id: &str, status: aria_store::BackgroundStatus) {
        for _ in 0..200 {
            if self.store.background(task_id).unwrap().map(|r| r.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "task {task_id} never reached {status}; currently {:?}",
            self.store.background(task_id).unwrap().map(|r| r.status)
        );
    }
}

fn chain_workflow() -> WorkflowDefinition {
    WorkflowDefinition::new("chain", "Chain")
        .add_step(ProcessingStep::new("one", |_| StepResult::success("1")).arc())
        .add_step(ProcessingStep::new("two", |_| StepResult::success("2")).arc())
        .add_step(ProcessingStep::new("three", |_| StepResult::success("3")).arc())
        .add_transition("one", Transition::unconditional("two"))
        .add_transition("two", Transition::unconditional("three"))
        .add_transition("three", Transition::unconditional(END))
        .entry_point("one")
}

#[tokio::test]
async fn finite_workflow_completes_with_step_list() {
    let fx = fixture();
    let (engine, session_id) = fx.engine(chain_workflow());

    let task_id = fx
        .executor
        .submit(engine, "chain", Some(session_id), &json!({}))
        .unwrap();

    // Queued immediately after submit (worker may already be running it).
    let record = fx.store.background(task_id.as_str()).unwrap().unwrap();
    assert!(matches!(
        record.status,
        aria_store::BackgroundStatus::Queued
            | aria_store::BackgroundStatus::Running
            | aria_store::BackgroundStatus::Completed
    ));

    fx.wait_for_status(task_id.as_str(), aria_store::BackgroundStatus::Completed)
        .await;

    let completed = fx
        .bus
        .recent_events(10, Some(aria_core::EventKind::BackgroundWorkflowCompleted));
    assert_eq!(completed.len(), 1);
    let steps = completed[0]
        .data
        .get("completed_steps")
        .and_then(|v| v.as_array())
        .unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(completed[0].str_field("task_id"), Some(task_id.as_str()));
}

#[tokio::test]
async fn interactive_workflow_is_refused() {
    let fx = fixture();
    let def = WorkflowDefinition::new("ask", "Ask")
        .add_step(InputStep::new("q", "tell me").arc())
        .add_transition("q", Transition::unconditional(END))
        .entry_point("q");
    let (engine, session_id) = fx.engine(def);

    let err = fx.executor.submit(engine, "ask", Some(session_id), &json!({}));
    assert!(matches!(err, Err(RuntimeError::Submit(_))));
    // Nothing persisted for the refused submit.
    assert!(fx
        .store
        .backgrounds_with_status(aria_store::BackgroundStatus::Queued)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failing_workflow_records_error_and_publishes() {
    let fx = fixture();
    let def = WorkflowDefinition::new("bad", "Bad")
        .add_step(ProcessingStep::new("boom", |_| StepResult::failure("exploded")).arc())
        .add_transition("boom", Transition::unconditional(END))
        .entry_point("boom");
    let (engine, session_id) = fx.engine(def);

    let task_id = fx
        .executor
        .submit(engine, "bad", Some(session_id), &json!({}))
        .unwrap();
    fx.wait_for_status(task_id.as_str(), aria_store::BackgroundStatus::Failed)
        .await;

    let record = fx.store.background(task_id.as_str()).unwrap().unwrap();
    assert_eq!(record.error_message.as_deref(), Some("exploded"));

    let failed = fx
        .bus
        .recent_events(10, Some(aria_core::EventKind::BackgroundWorkflowFailed));
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].str_field("error"), Some("exploded"));
}

#[tokio::test]
async fn cancel_is_cooperative() {
    let fx = fixture();
    let def = WorkflowDefinition::new("spin", "Spin")
        .add_step(
            LoopStep::new("forever", |_| StepResult::success("again").stay())
                .max_iterations(1_000_000)
                .arc(),
        )
        .add_transition("forever", Transition::unconditional(END))
        .entry_point("forever");
    let (engine, session_id) = fx.engine(def);

    let task_id = fx
        .executor
        .submit(engine, "spin", Some(session_id), &json!({}))
        .unwrap();
    fx.executor.cancel(task_id.as_str());

    fx.wait_for_status(task_id.as_str(), aria_store::BackgroundStatus::Cancelled)
        .await;
    let cancelled = fx
        .bus
        .recent_events(10, Some(aria_core::EventKind::BackgroundWorkflowCancelled));
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn iteration_cap_fails_runaway_workflows() {
    let fx = fixture();
    let def = WorkflowDefinition::new("runaway", "Runaway")
        .add_step(
            LoopStep::new("tight", |_| StepResult::success("again").stay())
                .max_iterations(1_000_000)
                .arc(),
        )
        .add_transition("tight", Transition::unconditional(END))
        .entry_point("tight");
    let (engine, session_id) = fx.engine(def);

    let task_id = fx
        .executor
        .submit(engine, "runaway", Some(session_id), &json!({}))
        .unwrap();
    fx.wait_for_status(task_id.as_str(), aria_store::BackgroundStatus::Failed)
        .await;

    let record = fx.store.background(task_id.as_str()).unwrap().unwrap();
    assert!(record.error_message.unwrap_or_default().contains("iteration cap"));
}

#[tokio::test]
async fn shutdown_joins_workers() {
    let fx = fixture();
    fx.executor.shutdown().await;
    // Submitting after shutdown is refused once workers are gone.
    let (engine, session_id) = fx.engine(chain_workflow());
    let result = fx.executor.submit(engine, "chain", Some(session_id), &json!({}));
    // The channel may still accept, but the record stays queued forever;
    // either outcome is acceptable as long as nothing panics.
    let _ = result;
}
