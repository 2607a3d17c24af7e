// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step outcomes as data.
//!
//! Every outcome a step can have — success, failure, cancellation,
//! completion, jumps — is an explicit flag on [`StepResult`]. Exceptions
//! are reserved for programmer errors and persistence faults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of executing one workflow step.
///
/// Construct through the factories (`success`, `failure`, `cancel_workflow`,
/// `complete_workflow`, `skip_to`) and refine with the `with_*` modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    /// Data merged into the session scope after a successful step.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Terminal: cancel the whole workflow.
    #[serde(default)]
    pub cancel: bool,
    /// Terminal: the workflow is complete.
    #[serde(default)]
    pub complete: bool,
    /// Explicit next step, overriding the transition table.
    #[serde(default)]
    pub next_step: Option<String>,
    /// Jump target, taking precedence over `next_step`.
    #[serde(default)]
    pub skip_to: Option<String>,
    /// Stay on the current step (loop idiom).
    #[serde(default)]
    pub continue_current_step: bool,
    /// Context handed to the LLM when the result is held at a review gate.
    #[serde(default)]
    pub llm_review_data: Option<Map<String, Value>>,
    /// The step wants an explicit user confirmation before proceeding.
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Set while an LLM-processing step waits for its output key.
    #[serde(default)]
    pub requires_llm_processing: bool,
}

impl StepResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn cancel_workflow(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            cancel: true,
            ..Self::default()
        }
    }

    pub fn complete_workflow(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            complete: true,
            ..Self::default()
        }
    }

    pub fn skip_to(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            skip_to: Some(step.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_next_step(mut self, step: impl Into<String>) -> Self {
        self.next_step = Some(step.into());
        self
    }

    /// Loop idiom: remain on the current step.
    pub fn stay(mut self) -> Self {
        self.continue_current_step = true;
        self
    }

    pub fn needs_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    pub fn with_review_data(mut self, data: Map<String, Value>) -> Self {
        self.llm_review_data = Some(data);
        self
    }

    pub fn awaiting_llm(mut self) -> Self {
        self.requires_llm_processing = true;
        self
    }

    /// True when this result ends the workflow one way or another.
    pub fn is_terminal(&self) -> bool {
        self.cancel || self.complete || !self.success
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
