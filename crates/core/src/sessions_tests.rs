// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::TestClock;
use crate::EventBus;

fn fixture() -> (Arc<SessionStore>, Arc<EventBus>) {
    let clock = TestClock::new();
    let bus = EventBus::new(Arc::clone(&clock) as Arc<dyn Clock>);
    let store = SessionStore::new(clock);
    (store, bus)
}

#[tokio::test]
async fn at_most_one_active_workflow_session() {
    let (store, bus) = fixture();
    let first = store
        .create_workflow_session(&bus, "drop_and_read", "read it")
        .unwrap();
    let second = store.create_workflow_session(&bus, "other", "cmd");
    match second {
        Err(SessionError::WorkflowAlreadyActive(id)) => assert_eq!(id, first.to_string()),
        other => panic!("expected WorkflowAlreadyActive, got {other:?}"),
    }

    // Chat sessions are not limited.
    let _chat = store.create_chat_session(&bus);
    assert_eq!(store.active_sessions().len(), 2);
}

#[tokio::test]
async fn workflow_slot_frees_after_finalization() {
    let (store, bus) = fixture();
    bus.start();
    let id = store
        .create_workflow_session(&bus, "drop_and_read", "cmd")
        .unwrap();
    store
        .mark_for_end(&id, "done", SessionStatus::Completed)
        .unwrap();
    let finalized = store.finalize_pending(&bus);
    assert_eq!(finalized, vec![id]);
    assert!(store.active_workflow_session().is_none());

    store.create_workflow_session(&bus, "next", "cmd").unwrap();
    bus.stop().await;
}

#[tokio::test]
async fn mark_for_end_defers_until_finalize() {
    let (store, bus) = fixture();
    bus.start();
    let id = store.create_chat_session(&bus);
    store
        .mark_for_end(&id, "user said goodbye", SessionStatus::Completed)
        .unwrap();

    // Still active until the cycle boundary.
    let session = store.get(&id).unwrap();
    assert!(session.is_active());
    assert!(session.pending_end);
    assert_eq!(session.pending_end_reason.as_deref(), Some("user said goodbye"));

    store.finalize_pending(&bus);
    bus.drain().await;

    let session = store.get(&id).unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(!session.pending_end);

    let ended = bus.recent_events(10, Some(EventKind::SessionEnded));
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].str_field("session_id"), Some(id.as_str()));
    bus.stop().await;
}

#[tokio::test]
async fn session_ended_published_exactly_once() {
    let (store, bus) = fixture();
    bus.start();
    let id = store.create_chat_session(&bus);
    store
        .mark_for_end(&id, "bye", SessionStatus::Cancelled)
        .unwrap();
    store.finalize_pending(&bus);
    // Second boundary: nothing left to finalize.
    assert!(store.finalize_pending(&bus).is_empty());
    bus.drain().await;

    let ended = bus.recent_events(10, Some(EventKind::SessionEnded));
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].str_field("status"), Some("cancelled"));
    bus.stop().await;
}

#[test]
fn mark_for_end_requires_terminal_status() {
    let (store, bus) = fixture();
    let id = store.create_chat_session(&bus);
    let err = store.mark_for_end(&id, "r", SessionStatus::Waiting);
    assert!(matches!(err, Err(SessionError::NotTerminal { .. })));
}

#[test]
fn empty_string_data_round_trips_as_present() {
    let (store, bus) = fixture();
    let id = store.create_chat_session(&bus);
    store.add_data(&id, "current_file_path", "").unwrap();
    assert_eq!(
        store.get_data(&id, "current_file_path"),
        Some(serde_json::json!(""))
    );
    // Absent key stays absent.
    assert_eq!(store.get_data(&id, "other"), None);
}

#[test]
fn step_history_and_current_step_tracking() {
    let (store, bus) = fixture();
    let id = store
        .create_workflow_session(&bus, "drop_and_read", "cmd")
        .unwrap();
    store.set_current_step(&id, Some("file_path_input"));
    store.record_step(&id, "file_path_input", "used existing data");

    let info = store.workflow_info(&id).unwrap();
    assert_eq!(info.current_step.as_deref(), Some("file_path_input"));
    assert_eq!(info.step_history.len(), 1);
    assert_eq!(info.step_history[0].step_id, "file_path_input");
}

#[test]
fn workflow_info_on_chat_session_is_an_error() {
    let (store, bus) = fixture();
    let id = store.create_chat_session(&bus);
    assert!(matches!(
        store.workflow_info(&id),
        Err(SessionError::NotAWorkflow(_))
    ));
}

#[tokio::test]
async fn end_session_is_immediate() {
    let (store, bus) = fixture();
    bus.start();
    let id = store.create_chat_session(&bus);
    store
        .end_session(&bus, &id, "shutdown", SessionStatus::Cancelled)
        .unwrap();
    assert_eq!(store.get(&id).unwrap().status, SessionStatus::Cancelled);

    // Already terminal: a second end is refused.
    assert!(matches!(
        store.end_session(&bus, &id, "again", SessionStatus::Cancelled),
        Err(SessionError::NotActive(_))
    ));
    bus.stop().await;
}
