// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::templates::{InputStep, ProcessingStep};
use serde_json::json;

fn two_step_def() -> WorkflowDefinition {
    WorkflowDefinition::new("demo", "Demo")
        .add_step(InputStep::new("ask", "what?").arc())
        .add_step(ProcessingStep::new("work", |_| StepResult::success("done")).arc())
        .add_transition("ask", Transition::unconditional("work"))
        .add_transition("work", Transition::unconditional(END))
        .entry_point("ask")
}

#[test]
fn valid_definition_passes() {
    assert!(two_step_def().validate().is_ok());
}

#[test]
fn missing_entry_point_is_rejected() {
    let def = two_step_def().entry_point("nope");
    assert!(matches!(
        def.validate(),
        Err(DefinitionError::MissingEntryPoint(s)) if s == "nope"
    ));
}

#[test]
fn dangling_transition_target_is_rejected() {
    let def = two_step_def().add_transition("work", Transition::unconditional("ghost"));
    assert!(matches!(
        def.validate(),
        Err(DefinitionError::UnknownTransitionTarget { target, .. }) if target == "ghost"
    ));
}

#[test]
fn unknown_transition_source_is_rejected() {
    let def = two_step_def().add_transition("ghost", Transition::unconditional(END));
    assert!(matches!(
        def.validate(),
        Err(DefinitionError::UnknownTransitionSource(s)) if s == "ghost"
    ));
}

#[test]
fn end_sentinel_parses() {
    assert_eq!(StepTarget::parse("END"), StepTarget::End);
    assert_eq!(
        StepTarget::parse("execute_read"),
        StepTarget::Step("execute_read".to_string())
    );
}

#[test]
fn guards_accept_on_data_and_result() {
    let mut data = aria_core::ContextMap::new();
    data.set("mode", "fast");
    data.set("empty", "");
    let ok = StepResult::success("ok");
    let bad = StepResult::failure("no");

    assert!(Guard::KeyEquals { key: "mode".into(), value: json!("fast") }.accepts(&ok, &data));
    assert!(!Guard::KeyEquals { key: "mode".into(), value: json!("slow") }.accepts(&ok, &data));
    // Presence, not truthiness: empty string present.
    assert!(Guard::KeyPresent { key: "empty".into() }.accepts(&ok, &data));
    assert!(!Guard::KeyPresent { key: "missing".into() }.accepts(&ok, &data));
    assert!(Guard::ResultSuccess.accepts(&ok, &data));
    assert!(!Guard::ResultSuccess.accepts(&bad, &data));

    let custom = Guard::Custom(std::sync::Arc::new(|r: &StepResult, _: &aria_core::ContextMap| {
        r.message.contains("ok")
    }));
    assert!(custom.accepts(&ok, &data));
}

#[test]
fn overview_lists_steps_in_declaration_order() {
    let def = two_step_def();
    let overview = def.overview();
    assert_eq!(overview.len(), 2);
    assert_eq!(overview[0].get("step_id"), Some(&json!("ask")));
    assert_eq!(overview[1].get("step_id"), Some(&json!("work")));
}
