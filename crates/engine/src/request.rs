// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed request surface consumed by the LLM's tool calls.
//!
//! Requests are a tagged enum with per-variant records; validation happens
//! here at the boundary, not inside the handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool call against the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    StartWorkflow {
        workflow_type: String,
        command: String,
        #[serde(default)]
        initial_data: Map<String, Value>,
    },
    ContinueWorkflow {
        session_id: String,
        user_input: String,
    },
    CancelWorkflow {
        session_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    ApproveStep {
        session_id: String,
    },
    ModifyStep {
        session_id: String,
        modified_params: Map<String, Value>,
    },
    CancelStep {
        session_id: String,
    },
    EndWorkflowSession {
        session_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    GetWorkflowStatus {
        session_id: String,
    },
}

/// Typed responses, one shape per request family.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Started {
        session_id: String,
        requires_input: bool,
        current_step_prompt: Option<String>,
        workflow_steps_overview: Vec<Map<String, Value>>,
        auto_continue: bool,
        /// Present for background-mode workflows.
        task_id: Option<String>,
    },
    Continued {
        status: String,
        requires_input: bool,
        prompt: Option<String>,
        data: Map<String, Value>,
        llm_review_data: Option<Map<String, Value>>,
    },
    Cancelled {
        status: String,
        message: String,
    },
    Ack {
        status: String,
        message: String,
    },
    Status {
        status: Value,
    },
}
