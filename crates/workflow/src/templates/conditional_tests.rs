// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::host::NoopHost;
use crate::templates::{InputStep, ProcessingStep};
use aria_core::SessionId;
use serde_json::json;

fn ctx<'a>(data: &'a mut ContextMap, host: &'a NoopHost) -> StepContext<'a> {
    StepContext {
        session_id: SessionId::from_string("ses-test"),
        data,
        host,
    }
}

fn timezone_conditional() -> ConditionalStep {
    // 1 = UTC (nothing to do), 2 = custom (needs input), 3 = local (compute)
    ConditionalStep::new("apply_timezone", "timezone_mode")
        .branch("1", vec![])
        .branch(
            "2",
            vec![
                InputStep::new("input_timezone", "which timezone?").arc(),
                ProcessingStep::new("store_timezone", |ctx| {
                    let tz = ctx.data.get_str("input_timezone").unwrap_or_default().to_string();
                    ctx.data.set("timezone", tz.clone());
                    StepResult::success("stored").with_entry("timezone", tz)
                })
                .arc(),
            ],
        )
        .branch(
            "3",
            vec![ProcessingStep::new("use_local", |ctx| {
                ctx.data.set("timezone", "local");
                StepResult::success("local").with_entry("timezone", "local")
            })
            .arc()],
        )
}

#[test]
fn missing_selector_fails() {
    let step = timezone_conditional();
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(!result.success);
}

#[test]
fn empty_branch_succeeds_immediately() {
    let step = timezone_conditional();
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("timezone_mode", 1);
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(result.success, "{}", result.message);
    assert!(result.skip_to.is_none());
}

#[test]
fn undeclared_branch_value_fails() {
    let step = timezone_conditional();
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("timezone_mode", 9);
    assert!(!step.execute(None, &mut ctx(&mut data, &host)).success);
}

#[test]
fn processing_branch_runs_to_completion() {
    let step = timezone_conditional();
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("timezone_mode", 3);
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(result.success);
    assert_eq!(data.get("timezone"), Some(&json!("local")));
}

#[test]
fn interactive_branch_step_pauses_with_resume_index() {
    let step = timezone_conditional();
    let host = NoopHost::new();
    let mut data = ContextMap::new();
    data.set("timezone_mode", 2);

    // First pass: pauses and jumps to the interactive branch step.
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(result.success);
    assert_eq!(result.skip_to.as_deref(), Some("input_timezone"));
    assert_eq!(data.get("__branch_resume_apply_timezone"), Some(&json!(1)));

    // The interactive step runs (via the graph) and its data lands.
    data.set("input_timezone", "UTC+9");

    // Second pass: resumes past the interactive step, runs the rest.
    let result = step.execute(None, &mut ctx(&mut data, &host));
    assert!(result.success, "{}", result.message);
    assert_eq!(data.get("timezone"), Some(&json!("UTC+9")));
    assert!(!data.has("__branch_resume_apply_timezone"));
}

#[test]
fn branch_steps_are_exposed_for_registration() {
    let step = timezone_conditional();
    let ids: Vec<&str> = step.branch_steps().map(|s| s.id()).collect();
    assert!(ids.contains(&"input_timezone"));
    assert!(ids.contains(&"store_timezone"));
    assert!(ids.contains(&"use_local"));
}
