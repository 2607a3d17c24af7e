// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aria_core::{event_data, Clock, EventBus, SessionStatus, SessionStore, TestClock};
use std::collections::HashMap;

struct Fixture {
    bus: Arc<EventBus>,
    sessions: Arc<SessionStore>,
    controller: Controller,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let clock = TestClock::new();
    let bus = EventBus::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let sessions = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let engines: EngineMap = Arc::new(Mutex::new(HashMap::new()));
    let dir = tempfile::tempdir().unwrap();
    let controller = Controller::new(
        Arc::clone(&bus),
        Arc::clone(&sessions),
        engines,
        dir.path().join("tasks.json"),
    );
    controller.attach();
    bus.start();
    Fixture { bus, sessions, controller, _dir: dir }
}

fn publish(fx: &Fixture, kind: EventKind) {
    fx.bus.publish(kind, event_data! {}, "test");
}

#[tokio::test]
async fn cycle_opens_and_closes_in_pairs() {
    let fx = fixture();

    publish(&fx, EventKind::InputLayerComplete);
    fx.bus.drain().await;
    assert!(fx.controller.current_cycle().is_some());
    assert_eq!(fx.bus.recent_events(10, Some(EventKind::CycleStarted)).len(), 1);

    publish(&fx, EventKind::ProcessingLayerComplete);
    publish(&fx, EventKind::OutputLayerComplete);
    fx.bus.drain().await;
    assert!(fx.controller.current_cycle().is_none());
    assert_eq!(fx.bus.recent_events(10, Some(EventKind::CycleCompleted)).len(), 1);

    // The ids pair up.
    let started = fx.bus.recent_events(10, Some(EventKind::CycleStarted));
    let completed = fx.bus.recent_events(10, Some(EventKind::CycleCompleted));
    assert_eq!(
        started[0].str_field("cycle_id"),
        completed[0].str_field("cycle_id")
    );
    fx.bus.stop().await;
}

#[tokio::test]
async fn second_input_is_absorbed_into_open_cycle() {
    let fx = fixture();

    publish(&fx, EventKind::InputLayerComplete);
    publish(&fx, EventKind::InputLayerComplete);
    fx.bus.drain().await;
    assert_eq!(fx.bus.recent_events(10, Some(EventKind::CycleStarted)).len(), 1);

    publish(&fx, EventKind::OutputLayerComplete);
    fx.bus.drain().await;
    assert_eq!(fx.bus.recent_events(10, Some(EventKind::CycleCompleted)).len(), 1);
    fx.bus.stop().await;
}

#[tokio::test]
async fn output_without_open_cycle_is_ignored() {
    let fx = fixture();
    publish(&fx, EventKind::OutputLayerComplete);
    fx.bus.drain().await;
    assert!(fx.bus.recent_events(10, Some(EventKind::CycleCompleted)).is_empty());
    fx.bus.stop().await;
}

#[tokio::test]
async fn pending_end_sessions_finalize_at_cycle_boundary() {
    let fx = fixture();
    let session_id = fx.sessions.create_chat_session(&fx.bus);
    fx.sessions
        .mark_for_end(&session_id, "goodbye said", SessionStatus::Completed)
        .unwrap();

    // Mid-cycle: nothing finalizes.
    publish(&fx, EventKind::InputLayerComplete);
    publish(&fx, EventKind::ProcessingLayerComplete);
    fx.bus.drain().await;
    assert!(fx.sessions.get(&session_id).unwrap().is_active());

    // Cycle completes: exactly one session_ended.
    publish(&fx, EventKind::OutputLayerComplete);
    fx.bus.drain().await;
    let session = fx.sessions.get(&session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    let ended = fx.bus.recent_events(10, Some(EventKind::SessionEnded));
    assert_eq!(ended.len(), 1);
    fx.bus.stop().await;
}

#[tokio::test]
async fn background_outcome_updates_registry_and_history() {
    let fx = fixture();
    fx.controller.register_task(TaskEntry {
        task_id: "task-x".to_string(),
        workflow_type: "chain".to_string(),
        session_id: None,
        status: "queued".to_string(),
        started_at_ms: 1,
    });
    assert_eq!(fx.controller.task("task-x").unwrap().status, "queued");

    fx.bus.publish(
        EventKind::BackgroundWorkflowCompleted,
        event_data! { "task_id" => "task-x" },
        "test",
    );
    fx.bus.drain().await;

    assert_eq!(fx.controller.task("task-x").unwrap().status, "completed");
    let history = fx.controller.task_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_id, "task-x");
    fx.bus.stop().await;
}

#[tokio::test]
async fn registry_snapshot_round_trips_through_disk() {
    let clock = TestClock::new();
    let bus = EventBus::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let sessions = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    {
        let controller = Controller::new(
            Arc::clone(&bus),
            Arc::clone(&sessions),
            Arc::new(Mutex::new(HashMap::new())),
            path.clone(),
        );
        controller.register_task(TaskEntry {
            task_id: "task-persist".to_string(),
            workflow_type: "chain".to_string(),
            session_id: Some("ses-1".to_string()),
            status: "running".to_string(),
            started_at_ms: 7,
        });
    }

    let controller = Controller::new(
        bus,
        sessions,
        Arc::new(Mutex::new(HashMap::new())),
        path,
    );
    controller.load_snapshot();
    let entry = controller.task("task-persist").unwrap();
    assert_eq!(entry.workflow_type, "chain");
    assert_eq!(entry.started_at_ms, 7);
}
