// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("no engine for session {0}")]
    EngineNotFound(String),

    #[error("session not active: {0}")]
    SessionNotActive(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("background submit error: {0}")]
    Submit(String),

    #[error("monitor pool at capacity ({0} active)")]
    MonitorCapacity(usize),

    #[error("restore failed for {0} task(s)")]
    RestoreFailed(usize),

    #[error("illegal state transition {from} -> {to}")]
    StateTransition { from: aria_core::SystemState, to: aria_core::SystemState },

    #[error(transparent)]
    Session(#[from] aria_core::SessionError),

    #[error(transparent)]
    Definition(#[from] aria_workflow::DefinitionError),

    #[error(transparent)]
    Engine(#[from] aria_workflow::EngineError),

    #[error(transparent)]
    Store(#[from] aria_store::StoreError),
}
