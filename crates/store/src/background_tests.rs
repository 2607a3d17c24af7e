// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

const NOW: u64 = 1_700_000_000_000;

fn store_with_task(task_id: &str) -> Store {
    let store = Store::open_in_memory().unwrap();
    store
        .insert_background(
            task_id,
            "folder_watch",
            &json!({"path": "/downloads"}),
            &json!({"pattern": "*.zip"}),
            NOW,
        )
        .unwrap();
    store
}

#[test]
fn insert_starts_queued_with_json_columns() {
    let store = store_with_task("task-a");
    let record = store.background("task-a").unwrap().unwrap();
    assert_eq!(record.status, BackgroundStatus::Queued);
    assert_eq!(record.workflow_type, "folder_watch");
    assert_eq!(record.trigger_conditions["path"], "/downloads");
    assert_eq!(record.metadata["pattern"], "*.zip");
    assert!(record.error_message.is_none());
}

#[yare::parameterized(
    queued_to_running = { BackgroundStatus::Queued, BackgroundStatus::Running, true },
    running_to_completed = { BackgroundStatus::Running, BackgroundStatus::Completed, true },
    running_to_failed = { BackgroundStatus::Running, BackgroundStatus::Failed, true },
    running_to_cancelled = { BackgroundStatus::Running, BackgroundStatus::Cancelled, true },
    running_to_suspended = { BackgroundStatus::Running, BackgroundStatus::Suspended, true },
    suspended_to_running = { BackgroundStatus::Suspended, BackgroundStatus::Running, true },
    queued_to_completed = { BackgroundStatus::Queued, BackgroundStatus::Completed, false },
    completed_to_running = { BackgroundStatus::Completed, BackgroundStatus::Running, false },
    suspended_to_completed = { BackgroundStatus::Suspended, BackgroundStatus::Completed, false },
    running_to_queued = { BackgroundStatus::Running, BackgroundStatus::Queued, false },
)]
fn transition_dag(from: BackgroundStatus, to: BackgroundStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn status_updates_follow_dag() {
    let store = store_with_task("task-a");
    store
        .set_background_status("task-a", BackgroundStatus::Running, NOW + 1)
        .unwrap();
    store
        .set_background_status("task-a", BackgroundStatus::Suspended, NOW + 2)
        .unwrap();
    store
        .set_background_status("task-a", BackgroundStatus::Running, NOW + 3)
        .unwrap();
    store
        .set_background_status("task-a", BackgroundStatus::Completed, NOW + 4)
        .unwrap();

    let record = store.background("task-a").unwrap().unwrap();
    assert_eq!(record.status, BackgroundStatus::Completed);
}

#[test]
fn illegal_transition_leaves_row_unchanged() {
    let store = store_with_task("task-a");
    let err = store.set_background_status("task-a", BackgroundStatus::Completed, NOW + 1);
    assert!(matches!(err, Err(StoreError::InvalidTransition { .. })));

    let record = store.background("task-a").unwrap().unwrap();
    assert_eq!(record.status, BackgroundStatus::Queued);
    assert_eq!(record.updated_at_ms, NOW);
}

#[test]
fn unknown_task_is_reported() {
    let store = Store::open_in_memory().unwrap();
    assert!(matches!(
        store.set_background_status("task-ghost", BackgroundStatus::Running, NOW),
        Err(StoreError::TaskNotFound(_))
    ));
    assert!(store.background("task-ghost").unwrap().is_none());
}

#[test]
fn suspended_query_feeds_restore() {
    let store = store_with_task("task-a");
    store
        .insert_background("task-b", "inbox_watch", &json!({}), &json!({}), NOW)
        .unwrap();
    for id in ["task-a", "task-b"] {
        store.set_background_status(id, BackgroundStatus::Running, NOW).unwrap();
        store.set_background_status(id, BackgroundStatus::Suspended, NOW).unwrap();
    }

    let suspended = store.backgrounds_with_status(BackgroundStatus::Suspended).unwrap();
    assert_eq!(suspended.len(), 2);
}

#[test]
fn check_bookkeeping_and_error_message() {
    let store = store_with_task("task-a");
    store.record_check("task-a", NOW + 5, Some(NOW + 65)).unwrap();
    store.set_background_error("task-a", "timeout talking to disk", NOW + 6).unwrap();

    let record = store.background("task-a").unwrap().unwrap();
    assert_eq!(record.last_check_at_ms, Some(NOW + 5));
    assert_eq!(record.next_check_at_ms, Some(NOW + 65));
    assert_eq!(record.error_message.as_deref(), Some("timeout talking to disk"));
}

#[test]
fn interventions_append_only_in_order() {
    let store = store_with_task("task-a");
    store
        .add_intervention("task-a", "pause", &json!({}), "llm", "paused", NOW)
        .unwrap();
    store
        .add_intervention("task-a", "resume", &json!({"speed": 2}), "llm", "resumed", NOW + 1)
        .unwrap();

    let log = store.interventions("task-a").unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].action, "pause");
    assert_eq!(log[1].action, "resume");
    assert_eq!(log[1].parameters["speed"], 2);

    // Foreign key: interventions require an existing task.
    assert!(store
        .add_intervention("task-ghost", "pause", &json!({}), "llm", "", NOW)
        .is_err());
}
