// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct BareStep;

impl Step for BareStep {
    fn id(&self) -> &str {
        "bare"
    }

    fn step_type(&self) -> StepType {
        StepType::Processing
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        "bare".to_string()
    }

    fn execute(&self, _input: Option<&str>, _ctx: &mut StepContext<'_>) -> StepResult {
        StepResult::success("ok")
    }
}

struct BareSystem;

impl Step for BareSystem {
    fn id(&self) -> &str {
        "sys"
    }

    fn step_type(&self) -> StepType {
        StepType::System
    }

    fn prompt(&self, _data: &ContextMap) -> String {
        String::new()
    }

    fn execute(&self, _input: Option<&str>, _ctx: &mut StepContext<'_>) -> StepResult {
        StepResult::success("ok")
    }
}

#[test]
fn processing_steps_auto_advance_by_default() {
    assert!(BareStep.should_auto_advance());
    assert!(!BareStep.review_gated());
}

#[test]
fn system_steps_gate_by_default() {
    assert!(BareSystem.should_auto_advance());
    assert!(BareSystem.review_gated());
}

#[test]
fn defaults_are_benign() {
    let step = BareStep;
    assert_eq!(step.description(), "");
    assert_eq!(step.priority(), StepPriority::Required);
    assert!(step.requirements().is_empty());
    assert!(!step.should_skip(&ContextMap::new()));
    assert!(step.llm_request(&ContextMap::new()).is_none());
}

#[test]
fn step_type_wire_values() {
    assert_eq!(StepType::Interactive.to_string(), "interactive");
    assert_eq!(StepType::LlmProcessing.to_string(), "llm_processing");
}
