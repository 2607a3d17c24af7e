// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step capability surface the engine drives.

use crate::host::HostActions;
use crate::result::StepResult;
use aria_core::{ContextMap, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a step is, from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Waits for user input; may skip when its data already exists.
    Interactive,
    /// Self-contained computation.
    Processing,
    /// Host-side side effect.
    System,
    /// Requests external LLM work and suspends until the output arrives.
    LlmProcessing,
}

aria_core::simple_display! {
    StepType {
        Interactive => "interactive",
        Processing => "processing",
        System => "system",
        LlmProcessing => "llm_processing",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPriority {
    Required,
    Optional,
}

/// Mutable execution context handed to [`Step::execute`].
pub struct StepContext<'a> {
    pub session_id: SessionId,
    /// Session-scoped working data.
    pub data: &'a mut ContextMap,
    /// Seam to host side effects (reminders, monitors, actions).
    pub host: &'a dyn HostActions,
}

/// Request an LLM-processing step hands to the external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub task_description: String,
    pub prompt: String,
    pub input_data: Map<String, Value>,
    /// Session-data key the LLM writes its result to.
    pub output_data_key: String,
    pub step_id: String,
}

/// One step in a workflow graph.
///
/// Implementations come from [`crate::templates`]; the engine only sees
/// this trait.
pub trait Step: Send + Sync {
    fn id(&self) -> &str;

    fn step_type(&self) -> StepType;

    fn description(&self) -> &str {
        ""
    }

    fn priority(&self) -> StepPriority {
        StepPriority::Required
    }

    /// Session-data keys that must be present before this step can run.
    fn requirements(&self) -> &[String] {
        &[]
    }

    /// Prompt shown when the step needs user input.
    fn prompt(&self, data: &ContextMap) -> String;

    /// Presence check, not truthiness: an empty string counts as present.
    fn should_skip(&self, _data: &ContextMap) -> bool {
        false
    }

    /// Whether the engine may drive the next step without user input.
    fn should_auto_advance(&self) -> bool {
        matches!(self.step_type(), StepType::Processing | StepType::System)
    }

    /// Whether this step's result is held for LLM review when the
    /// definition asks for review gating. Host side effects gate by default.
    fn review_gated(&self) -> bool {
        matches!(self.step_type(), StepType::System)
    }

    fn execute(&self, input: Option<&str>, ctx: &mut StepContext<'_>) -> StepResult;

    /// Only meaningful for [`StepType::LlmProcessing`] steps.
    fn llm_request(&self, _data: &ContextMap) -> Option<LlmRequest> {
        None
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
