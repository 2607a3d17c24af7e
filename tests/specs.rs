// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration scenarios exercising the whole runtime:
//! bus delivery, cycle discipline, workflow execution, background tasks,
//! monitor suspend/restore, and calendar staging.

use aria_core::{Clock, EventBus, EventKind, SessionId, SessionStatus, TestClock};
use aria_engine::{interval_monitor, Request, Response, Runtime, RuntimeConfig};
use aria_store::{BackgroundStatus, NotificationStage};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    runtime: Runtime,
    clock: Arc<TestClock>,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = TestClock::new();
    let runtime =
        Runtime::with_clock(RuntimeConfig::at(dir.path()), Arc::clone(&clock) as Arc<dyn Clock>)
            .unwrap();
    runtime.host().register_action("read_file", |params| {
        let path = params
            .get("file_path_input")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(json!(format!("contents of {path}")))
    });
    runtime.start();
    Fixture { runtime, clock, _dir: dir }
}

fn events(bus: &Arc<EventBus>, kind: EventKind) -> Vec<aria_core::Event> {
    bus.recent_events(100, Some(kind))
}

/// Scenario 1: a publish with zero subscribers succeeds, counts, and is
/// remembered in history.
#[tokio::test]
async fn empty_subscriber_publish() {
    let clock = TestClock::new();
    let bus = EventBus::new(clock as Arc<dyn Clock>);
    bus.start();

    let mut data = Map::new();
    data.insert("idx".to_string(), json!(1));
    bus.publish(EventKind::CycleStarted, data, "test");
    bus.drain().await;

    let stats = bus.stats();
    assert_eq!(stats.total_published, 1);
    assert_eq!(stats.total_processed, 0);
    let history = bus.recent_events(10, None);
    assert_eq!(
        history.last().unwrap().data.get("idx").and_then(Value::as_i64),
        Some(1)
    );
    bus.stop().await;
}

/// Scenario 2: three layer completions make one cycle; each subscriber
/// fires once and exactly one cycle_completed closes the exchange.
#[tokio::test]
async fn three_layer_cycle() {
    let fx = fixture();
    let bus = fx.runtime.bus();

    let calls = Arc::new(AtomicU32::new(0));
    for (kind, name) in [
        (EventKind::InputLayerComplete, "h_in"),
        (EventKind::ProcessingLayerComplete, "h_proc"),
        (EventKind::OutputLayerComplete, "h_out"),
    ] {
        let calls = Arc::clone(&calls);
        bus.subscribe(
            kind,
            Arc::new(move |_: &aria_core::Event| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            name,
        );
    }

    bus.publish(EventKind::InputLayerComplete, Map::new(), "stt");
    bus.publish(EventKind::ProcessingLayerComplete, Map::new(), "llm");
    bus.publish(EventKind::OutputLayerComplete, Map::new(), "tts");
    bus.drain().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(events(bus, EventKind::CycleStarted).len(), 1);
    assert_eq!(events(bus, EventKind::CycleCompleted).len(), 1);
    fx.runtime.shutdown().await;
}

/// Scenario 3: drop_and_read with the path already known skips the input
/// step, completes outright, and the session dies only at the boundary.
#[tokio::test]
async fn file_read_workflow() {
    let fx = fixture();
    let bus = fx.runtime.bus();

    let mut initial = Map::new();
    initial.insert("current_file_path".to_string(), json!("P"));
    let response = fx
        .runtime
        .handle(Request::StartWorkflow {
            workflow_type: "drop_and_read".to_string(),
            command: "read it".to_string(),
            initial_data: initial,
        })
        .unwrap();
    let Response::Started { session_id, requires_input, .. } = response else {
        panic!("expected Started");
    };
    assert!(!requires_input);
    bus.drain().await;

    // No input request; one terminal step event naming both steps.
    assert!(events(bus, EventKind::WorkflowRequiresInput).is_empty());
    let completed = events(bus, EventKind::WorkflowStepCompleted);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].bool_field("complete"), Some(true));
    let steps: Vec<&str> = completed[0]
        .data
        .get("executed_steps")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(steps, ["file_path_input", "execute_read"]);

    let id = SessionId::from_string(&session_id);
    assert!(fx.runtime.sessions().get(&id).unwrap().pending_end);
    assert!(events(bus, EventKind::SessionEnded).is_empty());

    // Next cycle boundary finalizes the session.
    bus.publish(EventKind::InputLayerComplete, Map::new(), "stt");
    bus.publish(EventKind::OutputLayerComplete, Map::new(), "tts");
    bus.drain().await;

    let ended = events(bus, EventKind::SessionEnded);
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].str_field("session_id"), Some(id.as_str()));
    assert_eq!(
        fx.runtime.sessions().get(&id).unwrap().status,
        SessionStatus::Completed
    );
    fx.runtime.shutdown().await;
}

/// Scenario 4: a finite background workflow goes queued → running →
/// completed and reports every step it ran.
#[tokio::test]
async fn background_task_round_trip() {
    let fx = fixture();
    let mut initial = Map::new();
    initial.insert("item_count".to_string(), json!(8));

    let response = fx
        .runtime
        .handle(Request::StartWorkflow {
            workflow_type: "batch_cleanup".to_string(),
            command: "clean".to_string(),
            initial_data: initial,
        })
        .unwrap();
    let Response::Started { task_id, .. } = response else {
        panic!("expected Started");
    };
    let task_id = task_id.expect("background start returns a task id");

    let mut status = BackgroundStatus::Queued;
    for _ in 0..200 {
        status = fx
            .runtime
            .store()
            .background(&task_id)
            .unwrap()
            .unwrap()
            .status;
        if status == BackgroundStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status, BackgroundStatus::Completed);

    fx.runtime.bus().drain().await;
    let completed = events(fx.runtime.bus(), EventKind::BackgroundWorkflowCompleted);
    assert_eq!(completed.len(), 1);
    let steps = completed[0]
        .data
        .get("completed_steps")
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(steps.len(), 3);
    fx.runtime.shutdown().await;
}

/// Scenario 5: a monitor survives shutdown as a suspended record and the
/// factory brings it back to running.
#[tokio::test]
async fn monitor_suspend_restore() {
    let fx = fixture();
    let ticks = Arc::new(AtomicU32::new(0));

    // Register the factory and create the monitor through a workflow.
    let factory_ticks = Arc::clone(&ticks);
    fx.runtime
        .restore_monitors(Arc::new(move |workflow_type: &str, _: &Value| {
            let ticks = Arc::clone(&factory_ticks);
            (workflow_type == "folder_watch").then(move || {
                interval_monitor(move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                })
            })
        }))
        .unwrap();

    let mut initial = Map::new();
    initial.insert("folder_path".to_string(), json!("/downloads"));
    fx.runtime
        .handle(Request::StartWorkflow {
            workflow_type: "watch_folder".to_string(),
            command: "watch downloads".to_string(),
            initial_data: initial,
        })
        .unwrap();

    let active = fx.runtime.monitors().active();
    assert_eq!(active.len(), 1);
    let task_id = active[0].clone();
    assert_eq!(
        fx.runtime.store().background(&task_id).unwrap().unwrap().status,
        BackgroundStatus::Running
    );

    // Shutdown suspends the monitor and stops its worker promptly.
    let report = fx.runtime.monitors().prepare_shutdown().await;
    assert_eq!(report.suspended, vec![task_id.clone()]);
    assert!(report.failed_to_stop.is_empty());
    assert_eq!(
        fx.runtime.store().background(&task_id).unwrap().unwrap().status,
        BackgroundStatus::Suspended
    );

    // Restore with the same factory: the same task set comes back.
    let factory_ticks = Arc::clone(&ticks);
    let report = fx
        .runtime
        .restore_monitors(Arc::new(move |workflow_type: &str, _: &Value| {
            let ticks = Arc::clone(&factory_ticks);
            (workflow_type == "folder_watch").then(move || {
                interval_monitor(move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                })
            })
        }))
        .unwrap();
    assert_eq!(report.restored, vec![task_id.clone()]);
    assert!(fx.runtime.monitors().active().contains(&task_id));
    assert_eq!(
        fx.runtime.store().background(&task_id).unwrap().unwrap().status,
        BackgroundStatus::Running
    );
    fx.runtime.shutdown().await;
}

/// Scenario 6: calendar staging fires each stage exactly once as the
/// event approaches.
#[tokio::test]
async fn calendar_staging_non_duplication() {
    let fx = fixture();
    let now = fx.clock.epoch_ms();
    const MIN: u64 = 60 * 1000;

    let id = fx
        .runtime
        .store()
        .add_calendar_event("launch", "", now + 30 * MIN, now + 60 * MIN, "", now)
        .unwrap();

    fx.runtime.scheduler().run_tick();
    let staged = events(fx.runtime.bus(), EventKind::CalendarEventStarting);
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].str_field("stage"), Some("1h_before"));

    // Ten seconds later: stage unchanged, nothing published.
    fx.clock.advance(Duration::from_secs(10));
    fx.runtime.scheduler().run_tick();
    assert_eq!(events(fx.runtime.bus(), EventKind::CalendarEventStarting).len(), 1);

    // Twenty minutes on, the event is 10 minutes out: 15min_before, once.
    fx.clock.advance(Duration::from_millis(20 * MIN - 10_000));
    fx.runtime.scheduler().run_tick();
    fx.runtime.scheduler().run_tick();
    let staged = events(fx.runtime.bus(), EventKind::CalendarEventStarting);
    assert_eq!(staged.len(), 2);
    assert_eq!(staged[1].str_field("stage"), Some("15min_before"));
    assert_eq!(
        fx.runtime
            .store()
            .calendar_event(id)
            .unwrap()
            .unwrap()
            .last_notified_stage,
        Some(NotificationStage::Before15m)
    );
    fx.runtime.shutdown().await;
}
