// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aria_core::{EventKind, TestClock};
use std::time::Duration;

struct Fixture {
    bus: Arc<EventBus>,
    clock: Arc<TestClock>,
    manager: StateManager,
    sidecar: PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let clock = TestClock::new();
    let bus = EventBus::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let dir = tempfile::tempdir().unwrap();
    let sidecar = dir.path().join("sleep_context.json");
    let manager = StateManager::new(
        Arc::clone(&bus),
        Arc::clone(&clock) as Arc<dyn Clock>,
        sidecar.clone(),
    );
    Fixture { bus, clock, manager, sidecar, _dir: dir }
}

#[test]
fn starts_idle_and_walks_legal_edges() {
    let fx = fixture();
    assert_eq!(fx.manager.current(), SystemState::Idle);

    fx.manager.transition(SystemState::Chat, "user spoke").unwrap();
    fx.manager.transition(SystemState::Idle, "conversation over").unwrap();
    fx.manager.transition(SystemState::Work, "workflow started").unwrap();
    fx.manager.transition(SystemState::Idle, "workflow done").unwrap();
    assert_eq!(fx.manager.current(), SystemState::Idle);

    let changes = fx.bus.recent_events(10, Some(EventKind::StateChanged));
    assert_eq!(changes.len(), 4);
    assert_eq!(changes[0].str_field("from"), Some("idle"));
    assert_eq!(changes[0].str_field("to"), Some("chat"));
}

#[test]
fn illegal_edge_is_rejected_and_state_unchanged() {
    let fx = fixture();
    fx.manager.transition(SystemState::Chat, "user spoke").unwrap();
    let err = fx.manager.transition(SystemState::Work, "impossible");
    assert!(matches!(err, Err(RuntimeError::StateTransition { .. })));
    assert_eq!(fx.manager.current(), SystemState::Chat);
}

#[test]
fn sleep_writes_sidecar_and_wake_clears_it() {
    let fx = fixture();
    fx.manager.enter_sleep("inactivity timeout", 0.6, 900).unwrap();
    assert_eq!(fx.manager.current(), SystemState::Sleep);

    let saved = aria_store::SleepContext::load(&fx.sidecar).unwrap();
    assert_eq!(saved.reason, "inactivity timeout");
    assert_eq!(saved.previous_state, "idle");
    assert_eq!(saved.inactive_duration_secs, 900);

    let entered = fx.bus.recent_events(10, Some(EventKind::SleepEntered));
    assert_eq!(entered.len(), 1);

    fx.clock.advance(Duration::from_secs(120));
    fx.manager.wake("user input").unwrap();
    assert_eq!(fx.manager.current(), SystemState::Idle);
    assert!(aria_store::SleepContext::load(&fx.sidecar).is_none());

    let exited = fx.bus.recent_events(10, Some(EventKind::SleepExited));
    assert_eq!(exited.len(), 1);
    assert_eq!(
        exited[0].data.get("slept_ms").and_then(|v| v.as_u64()),
        Some(120_000)
    );
}

#[test]
fn previous_sleep_surfaces_leftover_sidecar() {
    let fx = fixture();
    assert!(fx.manager.previous_sleep().is_none());
    fx.manager.enter_sleep("test", 0.0, 0).unwrap();
    // A "new process" over the same state dir sees the leftover context.
    assert!(fx.manager.previous_sleep().is_some());
}

#[test]
fn sleep_only_from_idle() {
    let fx = fixture();
    fx.manager.transition(SystemState::Chat, "user spoke").unwrap();
    assert!(fx.manager.enter_sleep("nope", 0.0, 0).is_err());
    assert_eq!(fx.manager.current(), SystemState::Chat);
}
