// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the core crate.

use crate::session::SessionStatus;
use thiserror::Error;

/// Error returned by an event handler.
///
/// Handler failures are counted by the bus and never stop delivery to the
/// remaining handlers.
#[derive(Debug, Clone, Error)]
#[error("handler error: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session not active: {0}")]
    NotActive(String),

    #[error("a workflow session is already active: {0}")]
    WorkflowAlreadyActive(String),

    #[error("session {0} is not a workflow session")]
    NotAWorkflow(String),

    #[error("invalid final status {status} for pending end")]
    NotTerminal { status: SessionStatus },
}
