// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    ready = { SessionStatus::Ready, true },
    executing = { SessionStatus::Executing, true },
    waiting = { SessionStatus::Waiting, true },
    completed = { SessionStatus::Completed, false },
    cancelled = { SessionStatus::Cancelled, false },
    failed = { SessionStatus::Failed, false },
)]
fn active_statuses(status: SessionStatus, active: bool) {
    assert_eq!(status.is_active(), active);
    assert_eq!(status.is_terminal(), !active);
}

#[test]
fn new_session_starts_ready() {
    let session = Session::new(SessionKind::Chatting, 1_000);
    assert_eq!(session.status, SessionStatus::Ready);
    assert!(session.is_active());
    assert!(!session.pending_end);
    assert_eq!(session.created_at_ms, 1_000);
}

#[test]
fn workflow_accessor_only_on_workflow_sessions() {
    let chat = Session::new(SessionKind::Chatting, 0);
    assert!(chat.workflow().is_none());

    let wf = Session::new(
        SessionKind::Workflow(WorkflowInfo {
            workflow_type: "drop_and_read".to_string(),
            command: "read this file".to_string(),
            step_history: Vec::new(),
            current_step: None,
        }),
        0,
    );
    assert_eq!(wf.workflow().map(|i| i.workflow_type.as_str()), Some("drop_and_read"));
}

#[test]
fn kind_serializes_tagged() {
    let kind = SessionKind::Workflow(WorkflowInfo {
        workflow_type: "t".to_string(),
        command: "c".to_string(),
        step_history: vec![],
        current_step: Some("s1".to_string()),
    });
    let json = serde_json::to_value(&kind).unwrap();
    assert_eq!(json["kind"], "workflow");
    assert_eq!(json["workflow_type"], "t");

    let chat = serde_json::to_value(SessionKind::Chatting).unwrap();
    assert_eq!(chat["kind"], "chatting");
}
